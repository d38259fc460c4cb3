//! Engine driver: the tick scheduler, the subsystem passes it runs, and the collaborators
//! (clock, randomness, scripts, output) every operation receives through [`GameContext`].

pub mod act;
pub mod context;
pub mod game;
pub mod random;
pub mod scheduler;
pub mod updates;

pub use act::{act, Audience, ActSink, Outbox};
pub use context::GameContext;
pub use game::Game;
pub use random::{RandomSource, ScriptedRandom, StdRandom};
pub use scheduler::{Cadence, Subsystem, TickHandler, TickScheduler};
