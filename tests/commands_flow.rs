use chrono::{TimeZone, Utc};
use mudengine::config::CombatConfig;
use mudengine::engine::{Game, GameContext, ScriptedRandom, TickScheduler};
use mudengine::server::commands::{execute, prompt, CommandResult};
use mudengine::world::templates::builtin_zones;
use mudengine::world::{FakeClock, LivingId, World};

fn village_game() -> Game {
    let start = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
    let world = World::from_zones(builtin_zones().unwrap(), "village:square", start).unwrap();
    let ctx = GameContext::new(CombatConfig::default())
        .with_clock(FakeClock::new(start))
        .with_rng(ScriptedRandom::new());
    Game::new(world, ctx, TickScheduler::default())
}

fn join(game: &mut Game, name: &str) -> LivingId {
    let start = game.world.start_room;
    game.world.add_player(name, start).unwrap()
}

#[test]
fn look_shows_room_and_exits() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    execute(&mut game, player, "look");
    assert!(game.ctx.out.contains(player, "Village Square"));
    assert!(game.ctx.out.contains(player, "[Exits: north east south west]"));
}

#[test]
fn walking_costs_moves_and_shows_the_new_room() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    let moves = game.world.living(player).unwrap().pools.moves;
    execute(&mut game, player, "n");
    assert_eq!(
        game.world.living(player).unwrap().room,
        game.world.resolve_room("village:temple").unwrap()
    );
    assert!(game.world.living(player).unwrap().pools.moves < moves);
    assert!(game.ctx.out.contains(player, "Temple of the Dawn"));
}

#[test]
fn closed_doors_block_until_opened() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    let road = game.world.resolve_room("village:road").unwrap();
    let gate = game.world.resolve_room("village:gate").unwrap();
    game.world.move_living(player, road).unwrap();

    execute(&mut game, player, "south");
    assert_eq!(game.world.living(player).unwrap().room, road);
    assert!(game.ctx.out.contains(player, "The door south is closed."));

    execute(&mut game, player, "open south");
    assert!(game.ctx.out.contains(player, "Ok."));
    execute(&mut game, player, "south");
    assert_eq!(game.world.living(player).unwrap().room, gate);
}

#[test]
fn no_fighting_in_safe_rooms() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    let other = join(&mut game, "Bo");
    let temple = game.world.resolve_room("village:temple").unwrap();
    game.world.move_living(player, temple).unwrap();
    game.world.move_living(other, temple).unwrap();

    execute(&mut game, player, "kill bo");
    assert!(game.ctx.out.contains(player, "too peaceful"));
    assert!(game.world.living(player).unwrap().target.is_none());
}

#[test]
fn get_wear_and_drop_items() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    let inn = game.world.resolve_room("village:inn").unwrap();
    game.world.move_living(player, inn).unwrap();

    execute(&mut game, player, "get jerkin");
    assert_eq!(game.world.living(player).unwrap().inventory.len(), 1);
    execute(&mut game, player, "wear jerkin");
    assert!(game.world.living(player).unwrap().inventory.is_empty());
    assert_eq!(game.world.living(player).unwrap().equipment.len(), 1);
    execute(&mut game, player, "remove jerkin");
    execute(&mut game, player, "drop jerkin");
    assert!(game.world.living(player).unwrap().inventory.is_empty());
    assert_eq!(game.world.room(inn).unwrap().items.len(), 1);
}

#[test]
fn save_and_quit_are_reported_to_the_server() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    assert_eq!(execute(&mut game, player, "save"), CommandResult::Save);
    assert_eq!(execute(&mut game, player, "quit"), CommandResult::Quit);

    let other = join(&mut game, "Bo");
    game.world.living_mut(player).unwrap().target = Some(other);
    assert_eq!(execute(&mut game, player, "quit"), CommandResult::Continue);
}

#[test]
fn unknown_words_get_huh() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    assert_eq!(execute(&mut game, player, "xyzzy"), CommandResult::Continue);
    assert!(game.ctx.out.contains(player, "Huh?"));
}

#[test]
fn wimpy_is_bounded_by_max_health() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    execute(&mut game, player, "wimpy 5");
    assert_eq!(game.world.living(player).unwrap().wimpy, 5);
    execute(&mut game, player, "wimpy 500");
    assert_eq!(game.world.living(player).unwrap().wimpy, 5);
    assert!(game.ctx.out.contains(player, "Wimpy must be between 0 and 10."));
}

#[test]
fn prompt_shows_pools() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    assert_eq!(prompt(&game, player).as_deref(), Some("<20/20hp 100/100m 100/100mv> "));
}

#[test]
fn corpses_cannot_be_picked_up() {
    let mut game = village_game();
    let player = join(&mut game, "Ada");
    let victim = join(&mut game, "Bo");
    game.world.make_corpse(victim, Utc::now()).unwrap();

    execute(&mut game, player, "get corpse");
    assert!(game.ctx.out.contains(player, "You can't take that."));
    assert!(game.world.living(player).unwrap().inventory.is_empty());
}
