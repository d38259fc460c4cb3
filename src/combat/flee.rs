//! Fleeing from combat.

use log::{debug, warn};

use crate::engine::act::{act, Audience};
use crate::engine::context::GameContext;
use crate::engine::updates;
use crate::metrics;
use crate::world::{Direction, LivingId, RoomFlag, World};

/// Exits a living could flee through right now, in direction order. Closed doors are never
/// usable. Monsters additionally avoid rooms flagged `NoMonster`.
pub fn flee_exits(world: &World, id: LivingId) -> Vec<Direction> {
    let living = match world.living(id) {
        Some(living) => living,
        None => return Vec::new(),
    };
    let room = match world.room(living.room) {
        Some(room) => room,
        None => return Vec::new(),
    };
    room.exits
        .iter()
        .filter(|(_, exit)| exit.is_open())
        .filter(|(dir, _)| {
            if living.is_player() {
                return true;
            }
            world
                .exit_destination_template(room.id, **dir)
                .is_some_and(|dest| !dest.has_flag(RoomFlag::NoMonster))
        })
        .map(|(dir, _)| *dir)
        .collect()
}

/// Break off every fight involving `id` and run through a random usable exit.
/// Returns the direction taken, or `None` when there was nowhere to go.
pub fn flee(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Option<Direction> {
    match world.living(id) {
        Some(living) if living.is_alive() => {}
        _ => return None,
    }
    let exits = flee_exits(world, id);
    let dir = match exits.len() {
        0 => {
            act(&mut ctx.out, world, "PANIC! You couldn't escape!", Audience::Actor, id, None);
            return None;
        }
        1 => exits[0],
        n => {
            let pick = ctx.rng.range(0, n as u32 - 1) as usize;
            exits[pick.min(n - 1)]
        }
    };

    let from = world.living(id)?.room;
    let now = ctx.now();
    let to = match world.traverse(from, dir, now) {
        Ok(Some(to)) => to,
        Ok(None) => return None,
        Err(e) => {
            warn!("{} could not flee {} from {}: {}", id, dir, from, e);
            return None;
        }
    };

    act(&mut ctx.out, world, "@n panics, and attempts to flee!", Audience::RoomExceptActor, id, None);
    if let Err(e) = world.move_living(id, to) {
        warn!("{} could not flee into {}: {}", id, to, e);
        return None;
    }
    world.stop_fighting(id);
    updates::run_init_hooks(world, ctx);
    metrics::record_flee();
    debug!("{} fled {} from {} to {}", id, dir, from, to);

    act(
        &mut ctx.out,
        world,
        &format!("You flee {}, head over heels.", dir),
        Audience::Actor,
        id,
        None,
    );
    act(&mut ctx.out, world, "@n arrives, panting heavily.", Audience::RoomExceptActor, id, None);
    Some(dir)
}
