//! Wall clock abstraction and the in-game calendar.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Source of "now" for affection expiry, corpse decay and zone resets.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock. Clones share the same instant so a test can keep a handle
/// after moving one copy into the game context.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

pub const HOURS_PER_DAY: u8 = 24;
pub const MINUTES_PER_HOUR: u8 = 60;
pub const SUNRISE_HOUR: u8 = 5;
pub const DAY_HOUR: u8 = 6;
pub const SUNSET_HOUR: u8 = 20;
pub const NIGHT_HOUR: u8 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPhase {
    Sunrise,
    Day,
    Sunset,
    Night,
}

impl DayPhase {
    pub fn is_dark(self) -> bool {
        matches!(self, DayPhase::Night)
    }

    /// Line sent to outdoor rooms when the phase begins.
    pub fn announcement(self) -> &'static str {
        match self {
            DayPhase::Sunrise => "The sun rises in the east.",
            DayPhase::Day => "The day has begun.",
            DayPhase::Sunset => "The sun slowly disappears in the west.",
            DayPhase::Night => "The night has begun.",
        }
    }
}

/// In-game calendar advanced one minute per time pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTime {
    pub minute: u8,
    pub hour: u8,
    pub day: u32,
}

impl Default for GameTime {
    fn default() -> Self {
        Self {
            minute: 0,
            hour: 8,
            day: 1,
        }
    }
}

impl GameTime {
    pub fn at_hour(hour: u8) -> Self {
        Self {
            minute: 0,
            hour: hour % HOURS_PER_DAY,
            day: 1,
        }
    }

    /// Advances one game minute. Returns the phase that just started, if the hour rolled
    /// over onto a phase boundary.
    pub fn advance_minute(&mut self) -> Option<DayPhase> {
        self.minute += 1;
        if self.minute < MINUTES_PER_HOUR {
            return None;
        }
        self.minute = 0;
        self.hour += 1;
        if self.hour >= HOURS_PER_DAY {
            self.hour = 0;
            self.day = self.day.saturating_add(1);
        }
        Self::phase_starting_at(self.hour)
    }

    pub fn phase(&self) -> DayPhase {
        match self.hour {
            h if h == SUNRISE_HOUR => DayPhase::Sunrise,
            h if h > SUNRISE_HOUR && h < SUNSET_HOUR => DayPhase::Day,
            h if h == SUNSET_HOUR => DayPhase::Sunset,
            _ => DayPhase::Night,
        }
    }

    fn phase_starting_at(hour: u8) -> Option<DayPhase> {
        match hour {
            SUNRISE_HOUR => Some(DayPhase::Sunrise),
            DAY_HOUR => Some(DayPhase::Day),
            SUNSET_HOUR => Some(DayPhase::Sunset),
            NIGHT_HOUR => Some(DayPhase::Night),
            _ => None,
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (display_hour, suffix) = match self.hour {
            0 => (12, "am"),
            h if h < 12 => (h, "am"),
            12 => (12, "pm"),
            h => (h - 12, "pm"),
        };
        write!(
            f,
            "{}:{:02}{} on day {}",
            display_hour, self.minute, suffix, self.day
        )
    }
}
