mod common;

use common::{arena_world, context, epoch, monster, room};
use mudengine::combat::{self, flee};
use mudengine::engine::ScriptedRandom;
use mudengine::world::{Direction, ExitTarget, FakeClock, RoomId};

#[test]
fn nowhere_to_run_means_no_flee() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let cell = room(&world, "arena:cell");
    let player = world.add_player("Rook", cell).unwrap();
    let other = world.add_player("Wren", cell).unwrap();
    world.living_mut(player).unwrap().target = Some(other);

    assert!(flee::flee_exits(&world, player).is_empty());
    assert_eq!(flee::flee(&mut world, &mut ctx, player), None);
    assert_eq!(world.living(player).unwrap().room, cell);
    assert_eq!(world.living(player).unwrap().target, Some(other));
    assert!(ctx.out.contains(player, "PANIC!"));
}

#[test]
fn single_exit_is_taken_and_fight_ends() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let shrine = room(&world, "arena:shrine");
    let gallery = room(&world, "arena:gallery");
    let player = world.add_player("Rook", shrine).unwrap();
    let other = world.add_player("Wren", shrine).unwrap();
    world.living_mut(player).unwrap().target = Some(other);
    world.living_mut(other).unwrap().target = Some(player);

    assert_eq!(flee::flee(&mut world, &mut ctx, player), Some(Direction::West));
    assert_eq!(world.living(player).unwrap().room, gallery);
    assert!(world.living(player).unwrap().target.is_none());
    assert!(world.living(other).unwrap().target.is_none());
    assert!(ctx.out.contains(other, "panics, and attempts to flee!"));
}

#[test]
fn monsters_never_flee_into_no_monster_rooms() {
    let mut world = arena_world();
    let gallery = room(&world, "arena:gallery");
    let pit = room(&world, "arena:pit");
    let hare = monster(&mut world, "arena:hare", gallery);
    let player = world.add_player("Rook", gallery).unwrap();

    assert_eq!(flee::flee_exits(&world, hare), vec![Direction::South]);
    assert_eq!(flee::flee_exits(&world, player).len(), 2);

    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    assert_eq!(flee::flee(&mut world, &mut ctx, hare), Some(Direction::South));
    assert_eq!(world.living(hare).unwrap().room, pit);
}

#[test]
fn wimpy_monster_flees_when_badly_hurt() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let gallery = room(&world, "arena:gallery");
    let pit = room(&world, "arena:pit");
    let hare = monster(&mut world, "arena:hare", gallery);
    let player = world.add_player("Rook", gallery).unwrap();
    combat::engage(&mut world, player, hare);

    assert_eq!(combat::check_wimpy(&mut world, &mut ctx, hare), None);

    world.living_mut(hare).unwrap().pools.health = 1;
    assert_eq!(combat::check_wimpy(&mut world, &mut ctx, hare), Some(Direction::South));
    assert_eq!(world.living(hare).unwrap().room, pit);
    assert!(world.living(player).unwrap().target.is_none());
}

#[test]
fn player_wimpy_threshold_triggers_flee() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let shrine = room(&world, "arena:shrine");
    let player = world.add_player("Rook", shrine).unwrap();
    let other = world.add_player("Wren", shrine).unwrap();
    combat::engage(&mut world, other, player);
    {
        let p = world.living_mut(player).unwrap();
        p.wimpy = 5;
        p.pools.health = 5;
    }
    assert_eq!(combat::check_wimpy(&mut world, &mut ctx, player), Some(Direction::West));
}

#[test]
fn failed_move_keeps_the_fight_going() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let shrine = room(&world, "arena:shrine");
    let player = world.add_player("Rook", shrine).unwrap();
    let other = world.add_player("Wren", shrine).unwrap();
    world.living_mut(player).unwrap().target = Some(other);
    world.living_mut(other).unwrap().target = Some(player);
    // The exit now points at a room that no longer exists.
    world.room_mut(shrine).unwrap().exits.get_mut(&Direction::West).unwrap().to =
        ExitTarget::Room(RoomId(9_999));

    assert_eq!(flee::flee(&mut world, &mut ctx, player), None);
    assert_eq!(world.living(player).unwrap().room, shrine);
    assert_eq!(world.living(player).unwrap().target, Some(other));
    assert_eq!(world.living(other).unwrap().target, Some(player));
}
