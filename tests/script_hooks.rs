mod common;

use chrono::Utc;
use common::{context, epoch};
use mudengine::config::CombatConfig;
use mudengine::engine::{updates, Game, GameContext, ScriptedRandom, TickScheduler};
use mudengine::scripting::{self, HookEvent, ScriptOutcome, ScriptType};
use mudengine::server::commands::{self, move_player};
use mudengine::world::templates::{builtin_zones, parse_zone};
use mudengine::world::{Direction, FakeClock, World};

const GATED: &str = r#"
name: gated
rooms:
  - id: hall
    name: Entrance Hall
    exits:
      north: vault
  - id: vault
    name: The Vault
    exits:
      south: hall
    scripts:
      - event: entry
        source: 'message("A ward pushes you back.") && handled()'
      - event: command
        source: '$input == "knock" && handled("Nobody answers.")'
items:
  - id: charm
    name: a lucky charm
    keywords: [charm]
    scripts:
      - event: command
        source: '$input == "rub charm" && message("The charm glows warmly.") && handled()'
"#;

fn gated_game() -> Game {
    let zone = parse_zone(GATED).unwrap();
    let world = World::from_zones(vec![zone], "gated:hall", epoch()).unwrap();
    let clock = FakeClock::new(epoch());
    Game::new(world, context(&clock, ScriptedRandom::new()), TickScheduler::default())
}

#[test]
fn entry_script_refuses_the_move() {
    let mut game = gated_game();
    let hall = game.world.start_room;
    let player = game.world.add_player("Ida", hall).unwrap();

    assert!(!move_player(&mut game, player, Direction::North));
    assert_eq!(game.world.living(player).unwrap().room, hall);
    assert!(game.ctx.out.contains(player, "A ward pushes you back."));
}

#[test]
fn carried_item_handles_a_command() {
    let mut game = gated_game();
    let hall = game.world.start_room;
    let player = game.world.add_player("Ida", hall).unwrap();
    game.world
        .spawn_item("gated:charm", mudengine::world::ItemLocation::Inventory(player))
        .unwrap();

    commands::execute(&mut game, player, "rub charm");
    assert!(game.ctx.out.contains(player, "The charm glows warmly."));
    assert!(!game.ctx.out.contains(player, "Huh?"));
}

#[test]
fn handled_value_is_shown_to_the_player() {
    let mut game = gated_game();
    let vault = game.world.resolve_room("gated:vault").unwrap();
    let player = game.world.add_player("Ida", vault).unwrap();

    let hook = HookEvent::new(ScriptType::Command, player, vault).with_input("knock");
    assert_eq!(
        scripting::dispatch(&game.world, &mut game.ctx, hook),
        ScriptOutcome::HandledWithValue("Nobody answers.".into())
    );

    commands::execute(&mut game, player, "knock");
    assert!(game.ctx.out.contains(player, "Nobody answers."));
}

#[test]
fn unrelated_input_falls_through_to_commands() {
    let mut game = gated_game();
    let vault = game.world.resolve_room("gated:vault").unwrap();
    let player = game.world.add_player("Ida", vault).unwrap();

    commands::execute(&mut game, player, "look");
    assert!(game.ctx.out.contains(player, "The Vault"));
}

#[test]
fn village_inn_prayer_is_scripted() {
    let world = World::from_zones(builtin_zones().unwrap(), "village:square", Utc::now()).unwrap();
    let ctx = GameContext::new(CombatConfig::default());
    let mut game = Game::new(world, ctx, TickScheduler::default());
    let inn = game.world.resolve_room("village:inn").unwrap();
    let player = game.world.add_player("Ida", inn).unwrap();
    let friend = game.world.add_player("Jo", inn).unwrap();

    commands::execute(&mut game, player, "pray");
    assert!(game.ctx.out.contains(player, "You bow your head and feel a little braver."));
    assert!(game.ctx.out.contains(friend, "Ida bows their head in prayer."));
}

const BARRACKS: &str = r#"
name: barracks
kind: static
reset_minutes: 1
rooms:
  - id: post
    name: The Guard Post
monsters:
  - id: sentry
    name: a sentry
    keywords: [sentry]
    level: 2
    max_health: 20
    damage: { min: 1, max: 2 }
    flags: [sentinel]
    scripts:
      - event: init
        source: 'echo("The sentry snaps to attention.")'
resets:
  - { type: monster, monster: sentry, room: post }
"#;

#[test]
fn respawned_monster_runs_its_init_script() {
    let zone = parse_zone(BARRACKS).unwrap();
    let world = World::from_zones(vec![zone], "barracks:post", epoch()).unwrap();
    let clock = FakeClock::new(epoch());
    let mut game = Game::new(world, context(&clock, ScriptedRandom::new()), TickScheduler::default());
    let post = game.world.start_room;
    let player = game.world.add_player("Ida", post).unwrap();
    assert!(!game.ctx.out.contains(player, "snaps to attention"));

    let sentry = game.world.livings().find(|l| l.is_monster()).map(|l| l.id).unwrap();
    game.world.remove_living(sentry);
    clock.advance(chrono::Duration::minutes(2));
    updates::update_zones(&mut game.world, &mut game.ctx).unwrap();

    assert!(game.world.livings().any(|l| l.is_monster()));
    assert!(game.ctx.out.contains(player, "The sentry snaps to attention."));

    // Each spawn gets its hook once.
    game.ctx.out.drain();
    updates::run_init_hooks(&mut game.world, &mut game.ctx);
    assert!(!game.ctx.out.contains(player, "snaps to attention"));
}
