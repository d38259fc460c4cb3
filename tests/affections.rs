mod common;

use chrono::Duration;
use common::{arena_world, context, epoch, room};
use mudengine::combat::spells::{self, spell_affection, CastOutcome};
use mudengine::engine::{updates, ScriptedRandom};
use mudengine::world::{
    Affection, AffectionSource, Affections, ExpiryCallback, FakeClock, HasModifiers, Modifier,
    Modifiers, SpellKind,
};

#[test]
fn expired_affections_are_removed_once() {
    let now = epoch();
    let mut list = Affections::new();
    list.add(Affection::new(
        AffectionSource::Spell(SpellKind::Armor),
        now + Duration::seconds(5),
        Modifiers::new().with(Modifier::Armor, 20),
    ));
    list.add(Affection::new(
        AffectionSource::Spell(SpellKind::Bless),
        now + Duration::seconds(60),
        Modifiers::new().with(Modifier::Hitroll, 2),
    ));
    assert_eq!(list.modifier(Modifier::Armor), 20);

    let later = now + Duration::seconds(10);
    let expired = list.update(later);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].source, AffectionSource::Spell(SpellKind::Armor));
    assert!(list.update(later).is_empty());
    assert_eq!(list.modifier(Modifier::Armor), 0);
    assert_eq!(list.modifier(Modifier::Hitroll), 2);
}

#[test]
fn repeated_casts_stack() {
    let mut world = arena_world();
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Odo", pit).unwrap();
    let now = epoch();
    for _ in 0..2 {
        let affection = spell_affection(SpellKind::Bless, 1, now).expect("bless lingers");
        world.living_mut(player).unwrap().affections.add(affection);
    }
    assert_eq!(world.modifier(player, Modifier::Hitroll), 4);
    assert_eq!(world.modifier(player, Modifier::Saves), 4);
}

#[test]
fn living_update_expires_and_runs_callbacks() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Odo", pit).unwrap();
    let watcher = world.add_player("Pia", pit).unwrap();

    let strength = Affection::new(
        AffectionSource::Spell(SpellKind::GiantStrength),
        epoch() + Duration::seconds(30),
        Modifiers::new().with(Modifier::Str, 2),
    )
    .with_callback(ExpiryCallback::Both {
        owner: "You feel weaker.".into(),
        room: "@n seems to shrink a little.".into(),
    });
    world.living_mut(player).unwrap().affections.add(strength);
    assert_eq!(world.modifier(player, Modifier::Str), 2);

    updates::update_living(&mut world, &mut ctx).unwrap();
    assert_eq!(world.modifier(player, Modifier::Str), 2);
    assert!(!ctx.out.contains(player, "You feel weaker."));

    clock.advance(Duration::seconds(31));
    updates::update_living(&mut world, &mut ctx).unwrap();
    assert_eq!(world.modifier(player, Modifier::Str), 0);
    assert!(ctx.out.contains(player, "You feel weaker."));
    assert!(ctx.out.contains(watcher, "seems to shrink a little."));

    ctx.out.clear();
    updates::update_living(&mut world, &mut ctx).unwrap();
    assert!(!ctx.out.contains(player, "You feel weaker."));
}

#[test]
fn casting_armor_costs_mana_and_protects() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Odo", pit).unwrap();
    let mana = world.living(player).unwrap().pools.mana;

    let outcome = spells::cast(&mut world, &mut ctx, player, SpellKind::Armor, None);
    assert_eq!(outcome, CastOutcome::Affected);
    assert_eq!(world.living(player).unwrap().pools.mana, mana - 10);
    assert_eq!(world.modifier(player, Modifier::Armor), 20);
    assert!(world
        .living(player)
        .unwrap()
        .affections
        .spell(SpellKind::Armor)
        .is_some());
}

#[test]
fn casting_without_mana_is_refused() {
    let mut world = arena_world();
    let clock = FakeClock::new(epoch());
    let mut ctx = context(&clock, ScriptedRandom::new());
    let pit = room(&world, "arena:pit");
    let player = world.add_player("Odo", pit).unwrap();
    world.living_mut(player).unwrap().pools.mana = 5;

    let outcome = spells::cast(&mut world, &mut ctx, player, SpellKind::Armor, None);
    assert_eq!(outcome, CastOutcome::NotEnoughMana { needed: 10 });
    assert_eq!(world.living(player).unwrap().pools.mana, 5);
    assert!(world.living(player).unwrap().affections.is_empty());
}
