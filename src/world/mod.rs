//! Entity and world graph: rooms, livings, items and the affections attached to them.

pub mod affection;
pub mod graph;
pub mod item;
pub mod living;
pub mod templates;
pub mod time;
pub mod types;

pub use affection::{Affection, AffectionSource, Affections, ExpiryCallback};
pub use graph::{Exit, ExitTarget, Room, World, ZoneId, ZoneState};
pub use item::{Item, ItemLocation};
pub use living::{Living, LivingKind, SpawnRef};
pub use templates::ItemFlag;
pub use time::{Clock, DayPhase, FakeClock, GameTime, SystemClock};
pub use types::*;
