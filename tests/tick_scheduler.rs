mod common;

use common::{arena_world, context, epoch};
use mudengine::engine::{Cadence, Game, ScriptedRandom, Subsystem, TickHandler, TickScheduler};
use mudengine::errors::GameError;
use mudengine::world::FakeClock;

#[derive(Default)]
struct Recorder {
    runs: Vec<(u64, Subsystem)>,
    tick: u64,
    fail: Option<Subsystem>,
}

impl TickHandler for Recorder {
    fn run_subsystem(&mut self, subsystem: Subsystem) -> Result<(), GameError> {
        self.runs.push((self.tick, subsystem));
        if self.fail == Some(subsystem) {
            return Err(GameError::InvalidState(format!("{} broke", subsystem)));
        }
        Ok(())
    }
}

fn run(scheduler: &mut TickScheduler, recorder: &mut Recorder, ticks: u64) {
    for _ in 0..ticks {
        recorder.tick = scheduler.counter() + 1;
        scheduler.tick(recorder);
    }
}

#[test]
fn fights_run_every_twenty_five_ticks() {
    let mut scheduler = TickScheduler::default();
    let mut recorder = Recorder::default();
    run(&mut scheduler, &mut recorder, 100);
    let fights: Vec<u64> = recorder
        .runs
        .iter()
        .filter(|(_, s)| *s == Subsystem::Fights)
        .map(|(tick, _)| *tick)
        .collect();
    assert_eq!(fights, vec![25, 50, 75, 100]);
    let time_runs = recorder.runs.iter().filter(|(_, s)| *s == Subsystem::Time).count();
    assert_eq!(time_runs, 10);
    let zone_runs = recorder.runs.iter().filter(|(_, s)| *s == Subsystem::Zones).count();
    assert_eq!(zone_runs, 1);
}

#[test]
fn subsystems_run_in_fixed_order_within_a_tick() {
    let mut scheduler = TickScheduler::default();
    let mut recorder = Recorder::default();
    run(&mut scheduler, &mut recorder, 100);
    let at_hundred: Vec<Subsystem> = recorder
        .runs
        .iter()
        .filter(|(tick, _)| *tick == 100)
        .map(|(_, s)| *s)
        .collect();
    assert_eq!(
        at_hundred,
        vec![
            Subsystem::Time,
            Subsystem::Rooms,
            Subsystem::Zones,
            Subsystem::Items,
            Subsystem::Living,
            Subsystem::Fights,
        ]
    );
}

#[test]
fn a_failing_subsystem_does_not_stop_the_tick() {
    let mut scheduler = TickScheduler::default();
    let mut recorder = Recorder {
        fail: Some(Subsystem::Rooms),
        ..Recorder::default()
    };
    run(&mut scheduler, &mut recorder, 50);
    let at_fifty: Vec<Subsystem> = recorder
        .runs
        .iter()
        .filter(|(tick, _)| *tick == 50)
        .map(|(_, s)| *s)
        .collect();
    assert_eq!(
        at_fifty,
        vec![
            Subsystem::Time,
            Subsystem::Rooms,
            Subsystem::Items,
            Subsystem::Living,
            Subsystem::Fights,
        ]
    );
}

#[test]
fn custom_cadence_is_respected() {
    let cadence = Cadence {
        fights: 3,
        ..Cadence::default()
    };
    let mut scheduler = TickScheduler::new(cadence);
    let mut recorder = Recorder::default();
    run(&mut scheduler, &mut recorder, 9);
    let fights = recorder.runs.iter().filter(|(_, s)| *s == Subsystem::Fights).count();
    assert_eq!(fights, 3);
}

#[test]
fn game_ticks_advance_the_calendar() {
    let world = arena_world();
    let clock = FakeClock::new(epoch());
    let ctx = context(&clock, ScriptedRandom::new());
    let mut game = Game::new(world, ctx, TickScheduler::default());
    let minutes = |g: &Game| u32::from(g.world.time.hour) * 60 + u32::from(g.world.time.minute);
    let before = minutes(&game);
    game.run_ticks(100);
    assert_eq!(game.scheduler.counter(), 100);
    assert_eq!((minutes(&game) + 1440 - before) % 1440, 10);
}
