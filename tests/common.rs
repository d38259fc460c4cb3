//! Test utilities & fixtures.
//! A small deterministic zone plus helpers for building a world and a context around it.

use chrono::{DateTime, TimeZone, Utc};
use mudengine::config::CombatConfig;
use mudengine::engine::{GameContext, ScriptedRandom};
use mudengine::world::templates::parse_zone;
use mudengine::world::{FakeClock, LivingId, RoomId, World};

/// Four rooms: a pit, a gallery above it, a shrine monsters avoid, and a sealed cell.
pub const ARENA: &str = r#"
name: arena
kind: static
rooms:
  - id: pit
    name: The Pit
    exits:
      north: gallery
  - id: gallery
    name: The Gallery
    exits:
      south: pit
      east: shrine
  - id: shrine
    name: The Shrine
    flags: [no_monster, safe]
    exits:
      west: gallery
  - id: cell
    name: A Sealed Cell
    exits:
      up: { to: pit, door: locked }
monsters:
  - id: dummy
    name: a training dummy
    keywords: [dummy]
    level: 1
    max_health: 10
    exp: 100
    damage: { min: 1, max: 1 }
  - id: hare
    name: a jumpy hare
    keywords: [hare]
    level: 1
    max_health: 10
    damage: { min: 1, max: 1 }
    flags: [wimpy, sentinel]
    scripts:
      - event: death
        source: 'echo("The hare squeaks its last.") && handled()'
"#;

pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp")
}

pub fn arena_world() -> World {
    let zone = parse_zone(ARENA).expect("arena parses");
    World::from_zones(vec![zone], "arena:pit", epoch()).expect("arena builds")
}

#[allow(dead_code)]
pub fn context(clock: &FakeClock, rng: ScriptedRandom) -> GameContext {
    GameContext::new(CombatConfig::default())
        .with_clock(clock.clone())
        .with_rng(rng)
}

#[allow(dead_code)]
pub fn room(world: &World, key: &str) -> RoomId {
    world.resolve_room(key).expect("room exists")
}

#[allow(dead_code)]
pub fn monster(world: &mut World, key: &str, room: RoomId) -> LivingId {
    world.spawn_monster(key, room, None).expect("monster spawns")
}
