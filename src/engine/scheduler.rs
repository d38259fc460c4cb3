//! Tick scheduler.
//!
//! One master counter advances by one per tick. Each subsystem runs on the ticks where the
//! counter is a multiple of its interval, and subsystems that are due on the same tick always
//! run in `Subsystem::ORDER`. A failing subsystem is logged and counted; the rest of the tick
//! still runs.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::GameError;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Time,
    Rooms,
    Zones,
    Items,
    Living,
    Fights,
}

impl Subsystem {
    pub const ORDER: [Subsystem; 6] = [
        Subsystem::Time,
        Subsystem::Rooms,
        Subsystem::Zones,
        Subsystem::Items,
        Subsystem::Living,
        Subsystem::Fights,
    ];
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Time => "time",
            Subsystem::Rooms => "rooms",
            Subsystem::Zones => "zones",
            Subsystem::Items => "items",
            Subsystem::Living => "living",
            Subsystem::Fights => "fights",
        };
        f.write_str(name)
    }
}

/// Interval, in ticks, for each subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cadence {
    pub time: u64,
    pub rooms: u64,
    pub zones: u64,
    pub items: u64,
    pub living: u64,
    pub fights: u64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            time: 10,
            rooms: 50,
            zones: 100,
            items: 50,
            living: 50,
            fights: 25,
        }
    }
}

impl Cadence {
    pub fn interval(&self, subsystem: Subsystem) -> u64 {
        let interval = match subsystem {
            Subsystem::Time => self.time,
            Subsystem::Rooms => self.rooms,
            Subsystem::Zones => self.zones,
            Subsystem::Items => self.items,
            Subsystem::Living => self.living,
            Subsystem::Fights => self.fights,
        };
        interval.max(1)
    }
}

/// Something that can run one subsystem pass.
pub trait TickHandler {
    fn run_subsystem(&mut self, subsystem: Subsystem) -> Result<(), GameError>;
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    counter: u64,
    cadence: Cadence,
}

impl TickScheduler {
    pub fn new(cadence: Cadence) -> Self {
        Self { counter: 0, cadence }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Advance the counter and report which subsystems are due, in run order.
    pub fn advance(&mut self) -> Vec<Subsystem> {
        self.counter = self.counter.wrapping_add(1);
        let counter = self.counter;
        Subsystem::ORDER
            .iter()
            .copied()
            .filter(|s| counter % self.cadence.interval(*s) == 0)
            .collect()
    }

    /// Advance one tick and run whatever is due on `handler`.
    pub fn tick(&mut self, handler: &mut dyn TickHandler) -> Vec<Subsystem> {
        let due = self.advance();
        run_due(&due, handler);
        due
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(Cadence::default())
    }
}

/// Run each due subsystem in order, logging failures without stopping.
pub fn run_due(due: &[Subsystem], handler: &mut dyn TickHandler) {
    metrics::record_tick();
    for subsystem in due {
        if let Err(e) = handler.run_subsystem(*subsystem) {
            metrics::record_subsystem_error();
            warn!("{} update failed: {}", subsystem, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cadence_matches_documented_intervals() {
        let cadence = Cadence::default();
        assert_eq!(cadence.interval(Subsystem::Fights), 25);
        assert_eq!(cadence.interval(Subsystem::Living), 50);
        assert_eq!(cadence.interval(Subsystem::Zones), 100);
        assert_eq!(cadence.interval(Subsystem::Time), 10);
    }

    #[test]
    fn zero_interval_is_treated_as_every_tick() {
        let cadence = Cadence {
            time: 0,
            ..Cadence::default()
        };
        let mut scheduler = TickScheduler::new(cadence);
        assert_eq!(scheduler.advance(), vec![Subsystem::Time]);
    }

    #[test]
    fn tick_hundred_runs_everything_in_order() {
        let mut scheduler = TickScheduler::default();
        let mut last = Vec::new();
        for _ in 0..100 {
            last = scheduler.advance();
        }
        assert_eq!(last, Subsystem::ORDER.to_vec());
    }
}
