use chrono::{DateTime, Utc};

use super::act::Outbox;
use super::random::{RandomSource, StdRandom};
use crate::config::CombatConfig;
use crate::scripting::{DslEvaluator, ScriptEvaluator};
use crate::world::time::{Clock, SystemClock};

/// Collaborators the engine needs but does not own: time, randomness, the script evaluator,
/// the output sink and tunables. Tests swap in `FakeClock` and `ScriptedRandom`.
pub struct GameContext {
    pub clock: Box<dyn Clock>,
    pub rng: Box<dyn RandomSource>,
    pub scripts: Box<dyn ScriptEvaluator>,
    pub out: Outbox,
    pub settings: CombatConfig,
}

impl GameContext {
    pub fn new(settings: CombatConfig) -> Self {
        Self {
            clock: Box::new(SystemClock),
            rng: Box::new(StdRandom::new()),
            scripts: Box::new(DslEvaluator::new()),
            out: Outbox::new(),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_scripts(mut self, scripts: impl ScriptEvaluator + 'static) -> Self {
        self.scripts = Box::new(scripts);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Default for GameContext {
    fn default() -> Self {
        Self::new(CombatConfig::default())
    }
}
