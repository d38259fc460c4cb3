use log::info;

use super::context::GameContext;
use super::scheduler::{run_due, Subsystem, TickHandler, TickScheduler};
use super::updates;
use crate::errors::GameError;
use crate::world::World;

/// The world plus everything needed to drive it. Owned by a single task; commands and
/// ticks both run against it synchronously.
pub struct Game {
    pub world: World,
    pub ctx: GameContext,
    pub scheduler: TickScheduler,
}

impl Game {
    pub fn new(mut world: World, mut ctx: GameContext, scheduler: TickScheduler) -> Self {
        updates::run_init_hooks(&mut world, &mut ctx);
        info!(
            "game ready: {} rooms, {} livings, {} items",
            world.room_ids().len(),
            world.living_ids().len(),
            world.item_ids().len()
        );
        Self {
            world,
            ctx,
            scheduler,
        }
    }

    /// Advance one tick and run whatever subsystems are due.
    pub fn tick(&mut self) -> Vec<Subsystem> {
        let due = self.scheduler.advance();
        run_due(&due, self);
        due
    }

    /// Run `count` ticks back to back.
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }
}

impl TickHandler for Game {
    fn run_subsystem(&mut self, subsystem: Subsystem) -> Result<(), GameError> {
        let (world, ctx) = (&mut self.world, &mut self.ctx);
        match subsystem {
            Subsystem::Time => updates::update_time(world, ctx),
            Subsystem::Rooms => updates::update_rooms(world, ctx),
            Subsystem::Zones => updates::update_zones(world, ctx),
            Subsystem::Items => updates::update_items(world, ctx),
            Subsystem::Living => updates::update_living(world, ctx),
            Subsystem::Fights => updates::update_fights(world, ctx),
        }
    }
}
