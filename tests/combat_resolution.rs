mod common;

use common::{arena_world, context, epoch, monster, room};
use mudengine::combat::{self, AttackOutcome};
use mudengine::engine::ScriptedRandom;
use mudengine::world::FakeClock;

#[test]
fn killing_blow_awards_experience_and_leaves_corpse() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new().with_rolls([1]));
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Vera", pit).unwrap();
    let dummy = monster(&mut world, "arena:dummy", pit);
    world.living_mut(dummy).unwrap().pools.health = 1;

    let outcome = combat::attack(&mut world, &mut ctx, player, dummy);
    let death = match outcome {
        AttackOutcome::Killed { damage, death } => {
            assert_eq!(damage, 1);
            death
        }
        other => panic!("expected a kill, got {:?}", other),
    };

    assert!(!death.was_player);
    assert_eq!(death.killer, Some(player));
    // 100 exp over 10 max health, 1 damage dealt, same level
    assert_eq!(death.awards, vec![(player, 10)]);
    assert_eq!(world.living(player).unwrap().exp, 10);
    assert!(world.living(dummy).is_none());
    assert!(world.living(player).unwrap().target.is_none());

    let corpse = death.corpse.expect("corpse left behind");
    assert!(world.room(pit).unwrap().items.contains(&corpse));
    assert!(world.item(corpse).unwrap().is_corpse());
    assert!(ctx.out.contains(player, "is DEAD!! R.I.P."));
    assert!(ctx.out.contains(player, "You receive 10 experience points."));
}

#[test]
fn hit_records_damage_and_starts_fight() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new().with_rolls([1]));
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Vera", pit).unwrap();
    let dummy = monster(&mut world, "arena:dummy", pit);

    let outcome = combat::attack(&mut world, &mut ctx, player, dummy);
    assert_eq!(outcome, AttackOutcome::Hit { damage: 1 });

    let d = world.living(dummy).unwrap();
    assert_eq!(d.pools.health, 9);
    assert_eq!(d.damage_taken.get(&player), Some(&1));
    assert_eq!(d.target, Some(player));
    assert_eq!(world.living(player).unwrap().target, Some(dummy));
}

#[test]
fn miss_still_engages_both_sides() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new().with_rolls([100]));
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Vera", pit).unwrap();
    let dummy = monster(&mut world, "arena:dummy", pit);

    assert_eq!(combat::attack(&mut world, &mut ctx, player, dummy), AttackOutcome::Missed);
    assert_eq!(world.living(dummy).unwrap().pools.health, 10);
    assert_eq!(world.living(dummy).unwrap().target, Some(player));
    assert!(ctx.out.contains(player, "You miss"));
}

#[test]
fn target_in_another_room_is_invalid() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let gallery = room(&world, "arena:gallery");
    let player = world.add_player("Vera", pit).unwrap();
    let dummy = monster(&mut world, "arena:dummy", gallery);

    assert_eq!(combat::attack(&mut world, &mut ctx, player, dummy), AttackOutcome::Invalid);
    assert!(world.living(player).unwrap().target.is_none());
    assert_eq!(world.living(dummy).unwrap().pools.health, 10);
}

#[test]
fn fight_round_drops_a_target_that_left() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let gallery = room(&world, "arena:gallery");
    let player = world.add_player("Vera", pit).unwrap();
    let dummy = monster(&mut world, "arena:dummy", gallery);
    world.living_mut(player).unwrap().target = Some(dummy);

    combat::fight_round(&mut world, &mut ctx, player).unwrap();
    assert!(world.living(player).unwrap().target.is_none());
    assert_eq!(world.living(dummy).unwrap().pools.health, 10);
}

#[test]
fn death_runs_only_once() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let dummy = monster(&mut world, "arena:dummy", pit);

    assert!(combat::death(&mut world, &mut ctx, dummy, None).is_some());
    assert!(combat::death(&mut world, &mut ctx, dummy, None).is_none());
    let corpses = world
        .room(pit)
        .unwrap()
        .items
        .iter()
        .filter(|id| world.item(**id).is_some_and(|i| i.is_corpse()))
        .count();
    assert_eq!(corpses, 1);
}

#[test]
fn dead_player_wakes_in_start_room() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let gallery = room(&world, "arena:gallery");
    let player = world.add_player("Vera", gallery).unwrap();

    let report = combat::death(&mut world, &mut ctx, player, None).expect("death runs");
    assert!(report.was_player);
    let corpse = report.corpse.expect("corpse");
    assert!(world.room(gallery).unwrap().items.contains(&corpse));

    let p = world.living(player).expect("players are not removed");
    assert_eq!(p.room, pit);
    assert_eq!(p.pools.health, 1);
    assert!(!p.dead);
    assert!(ctx.out.contains(player, "You are DEAD!!"));
}

#[test]
fn death_script_replaces_default_message() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new().with_rolls([1]));
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Vera", pit).unwrap();
    let hare = monster(&mut world, "arena:hare", pit);
    world.living_mut(hare).unwrap().pools.health = 1;

    assert!(combat::attack(&mut world, &mut ctx, player, hare).is_kill());
    assert!(ctx.out.contains(player, "The hare squeaks its last."));
    assert!(!ctx.out.contains(player, "R.I.P."));
}
