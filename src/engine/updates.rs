//! Periodic subsystem passes.
//!
//! Each pass walks a snapshot of ids taken up front, so livings and items created or removed
//! during the pass never invalidate the walk. A failure for one living, item or zone is
//! logged and the pass moves on to the next one.

use log::{debug, warn};

use super::act::{act, send_to_room, ActSink, Audience};
use super::context::GameContext;
use crate::combat::{self, flee, spells};
use crate::errors::GameError;
use crate::scripting::{self, HookEvent, ScriptType};
use crate::world::{
    Affection, ExpiryCallback, ItemId, ItemLocation, LivingFlag, LivingId, RoomFlag, World,
};

fn isolate(kind: &str, unit: impl std::fmt::Display, result: Result<(), GameError>) {
    if let Err(e) = result {
        warn!("{} update for {} failed: {}", kind, unit, e);
    }
}

/// Advance the game clock one minute and announce day phase changes outdoors.
pub fn update_time(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    let phase = match world.time.advance_minute() {
        Some(phase) => phase,
        None => return Ok(()),
    };
    debug!("day phase changed to {:?} at {}", phase, world.time);
    let outdoors: Vec<LivingId> = world
        .players()
        .filter(|p| world.room(p.room).is_some_and(|r| r.template.is_outdoors()))
        .map(|p| p.id)
        .collect();
    for id in outdoors {
        ctx.out.send(id, phase.announcement().to_string());
    }
    Ok(())
}

/// Occasional ambient text in occupied rooms, picked by time of day.
pub fn update_rooms(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    let dark = world.time.phase().is_dark();
    for room_id in world.room_ids() {
        if world.players_in_room(room_id).is_empty() {
            continue;
        }
        let lines = match world.room(room_id) {
            Some(room) if dark => room.template.ambient.night.clone(),
            Some(room) => room.template.ambient.day.clone(),
            None => continue,
        };
        if lines.is_empty() || ctx.rng.percent_roll() > ctx.settings.ambient_chance {
            continue;
        }
        let pick = ctx.rng.range(0, lines.len() as u32 - 1) as usize;
        if let Some(line) = lines.get(pick) {
            send_to_room(&mut ctx.out, world, room_id, line, None);
        }
    }
    Ok(())
}

/// Reset static zones whose interval elapsed and tear down empty dynamic instances.
pub fn update_zones(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    let now = ctx.now();
    for zone_id in world.zone_ids() {
        let (dynamic, due) = match world.zone(zone_id) {
            Some(zone) => {
                let interval = chrono::Duration::minutes(i64::from(zone.template.reset_minutes));
                (zone.is_dynamic(), now - zone.last_reset >= interval)
            }
            None => continue,
        };
        let result = if dynamic {
            if world.zone_has_players(zone_id) {
                Ok(())
            } else {
                world.destroy_zone(zone_id)
            }
        } else if due {
            debug!("resetting zone {:?}", zone_id);
            world.reset_zone(zone_id, now)
        } else {
            Ok(())
        };
        isolate("zone", format!("{:?}", zone_id), result);
    }
    run_init_hooks(world, ctx);
    Ok(())
}

/// Run the `Init` hook for every monster spawned since the last call. Monsters that died
/// or were removed in the meantime are skipped.
pub fn run_init_hooks(world: &mut World, ctx: &mut GameContext) {
    for id in world.take_spawned() {
        let room = match world.living(id) {
            Some(living) if living.is_alive() => living.room,
            _ => continue,
        };
        scripting::dispatch(world, ctx, HookEvent::new(ScriptType::Init, id, room));
    }
}

/// Decay corpses and expire item affections.
pub fn update_items(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    let now = ctx.now();
    for id in world.item_ids() {
        let result = update_item(world, ctx, id, now);
        isolate("item", id, result);
    }
    Ok(())
}

fn update_item(
    world: &mut World,
    ctx: &mut GameContext,
    id: ItemId,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(), GameError> {
    let (expired, decayed, location, name) = match world.item_mut(id) {
        Some(item) => (
            item.affections.update(now),
            item.decay_at.is_some_and(|at| at <= now),
            item.location,
            item.name.clone(),
        ),
        None => return Ok(()),
    };
    if let ItemLocation::Room(room_id) = location {
        for affection in &expired {
            let text = match &affection.on_expire {
                Some(ExpiryCallback::RoomMessage(text)) => text.replace("@n", &name),
                Some(ExpiryCallback::Both { room, .. }) => room.replace("@n", &name),
                _ => continue,
            };
            send_to_room(&mut ctx.out, world, room_id, &text, None);
        }
    }
    if !decayed {
        return Ok(());
    }

    // Whatever was left in the corpse spills onto the floor.
    let contents = world.item(id).map(|i| i.contents.clone()).unwrap_or_default();
    if let ItemLocation::Room(room) = location {
        for inner in contents {
            world.move_item(inner, ItemLocation::Room(room))?;
        }
        let text = format!("{} rots away.", crate::world::living::capitalize(&name));
        send_to_room(&mut ctx.out, world, room, &text, None);
    }
    world.remove_item(id);
    debug!("{} decayed", id);
    Ok(())
}

/// Affection expiry, poison, regeneration and monster behaviour.
pub fn update_living(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    for id in world.living_ids() {
        let result = update_one_living(world, ctx, id);
        isolate("living", id, result);
    }
    Ok(())
}

fn deliver_expiry(world: &World, ctx: &mut GameContext, id: LivingId, expired: &[Affection]) {
    for affection in expired {
        match &affection.on_expire {
            Some(ExpiryCallback::Message(text)) => ctx.out.send(id, text.clone()),
            Some(ExpiryCallback::RoomMessage(text)) => {
                act(&mut ctx.out, world, text, Audience::RoomExceptActor, id, None)
            }
            Some(ExpiryCallback::Both { owner, room }) => {
                ctx.out.send(id, owner.clone());
                act(&mut ctx.out, world, room, Audience::RoomExceptActor, id, None);
            }
            None => {}
        }
    }
}

fn update_one_living(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Result<(), GameError> {
    let now = ctx.now();
    let expired = match world.living_mut(id) {
        Some(living) if living.is_alive() => living.affections.update(now),
        _ => return Ok(()),
    };
    deliver_expiry(world, ctx, id, &expired);

    if let Some(outcome) = spells::apply_poison(world, ctx, id) {
        if outcome.is_kill() {
            return Ok(());
        }
    }

    let room = match world.living(id) {
        Some(living) if living.is_alive() => living.room,
        _ => return Ok(()),
    };
    if scripting::dispatch(world, ctx, HookEvent::new(ScriptType::Update, id, room)).is_handled() {
        return Ok(());
    }

    regenerate(world, ctx, id);
    if world.living(id).is_some_and(|l| l.is_monster() && !l.is_fighting()) {
        monster_behaviour(world, ctx, id)?;
    }
    Ok(())
}

fn regenerate(world: &mut World, ctx: &mut GameContext, id: LivingId) {
    let settings = &ctx.settings;
    let living = match world.living_mut(id) {
        Some(living) if !living.is_fighting() => living,
        _ => return,
    };
    let share = |max: i32, percent: u32| (max * percent as i32 / 100).max(1);
    let pools = &mut living.pools;
    let health = share(pools.max_health, settings.health_regen_percent);
    let mana = share(pools.max_mana, settings.mana_regen_percent);
    let moves = share(pools.max_moves, settings.move_regen_percent);
    pools.restore(health, mana, moves);
    if pools.health >= pools.max_health {
        living.damage_taken.clear();
    }
}

fn monster_behaviour(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Result<(), GameError> {
    let (room, aggressive, sentinel) = match world.living(id) {
        Some(l) => (l.room, l.has_flag(LivingFlag::Aggressive), l.has_flag(LivingFlag::Sentinel)),
        None => return Ok(()),
    };
    let safe = world.room(room).is_some_and(|r| r.has_flag(RoomFlag::Safe));

    if aggressive && !safe {
        let victim = world
            .players_in_room(room)
            .into_iter()
            .find(|p| world.valid_target(id, *p));
        if let Some(victim) = victim {
            act(&mut ctx.out, world, "@n snarls and attacks @t!", Audience::RoomExceptActor, id, Some(victim));
            combat::attack(world, ctx, id, victim);
            return Ok(());
        }
    }

    if sentinel || ctx.rng.percent_roll() > ctx.settings.wander_chance {
        return Ok(());
    }
    wander(world, ctx, id, room)
}

/// Step through a random open exit that stays inside the monster's zone.
fn wander(world: &mut World, ctx: &mut GameContext, id: LivingId, room: crate::world::RoomId) -> Result<(), GameError> {
    let zone = match world.room(room) {
        Some(r) => r.zone,
        None => return Ok(()),
    };
    let choices: Vec<crate::world::RoomId> = flee::flee_exits(world, id)
        .into_iter()
        .filter_map(|dir| match world.exit(room, dir).map(|e| e.to.clone()) {
            Some(crate::world::ExitTarget::Room(to)) => Some(to),
            _ => None,
        })
        .filter(|to| world.room(*to).is_some_and(|r| r.zone == zone))
        .collect();
    if choices.is_empty() {
        return Ok(());
    }
    let pick = ctx.rng.range(0, choices.len() as u32 - 1) as usize;
    let to = match choices.get(pick) {
        Some(to) => *to,
        None => return Ok(()),
    };
    act(&mut ctx.out, world, "@n leaves.", Audience::RoomExceptActor, id, None);
    world.move_living(id, to)?;
    act(&mut ctx.out, world, "@n arrives.", Audience::RoomExceptActor, id, None);
    Ok(())
}

/// One combat round for every living with a target, in id order.
pub fn update_fights(world: &mut World, ctx: &mut GameContext) -> Result<(), GameError> {
    let fighters: Vec<LivingId> = world
        .livings()
        .filter(|l| l.is_fighting())
        .map(|l| l.id)
        .collect();
    for id in fighters {
        let result = combat::fight_round(world, ctx, id);
        isolate("fight", id, result);
    }
    Ok(())
}
