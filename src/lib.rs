//! # mudengine - A Tick-Driven Multi-User Dungeon Server
//!
//! mudengine runs a persistent text world: rooms joined by exits, monsters spawned from zone
//! templates, items, and players connected over telnet. All simulation happens on a fixed
//! tick; commands from players are applied between ticks.
//!
//! ## Features
//!
//! - **Combat**: to-hit and damage rolls, spells, backstab, disarm, rescue, fleeing and wimpy.
//! - **Affections**: timed modifiers on livings and items with expiry callbacks.
//! - **Scheduler**: per-subsystem cadences (time, rooms, zones, items, livings, fights).
//! - **Experience**: level curve, exp-per-kill with level penalties and group sharing.
//! - **Scripts**: small hook scripts on monsters, rooms and items that can override defaults.
//! - **World graph**: YAML zone templates, static and dynamic zone instances, zone resets.
//! - **Persistence**: players saved to sled with bincode, keyed by name.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudengine::config::Config;
//! use mudengine::server::MudServer;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     MudServer::new(config)?.run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - entities, affections, zone templates and the world graph
//! - [`combat`] - attack resolution, spells, skills, flee and experience
//! - [`engine`] - tick scheduler, subsystem updates and the operation context
//! - [`scripting`] - hook script parser and evaluator
//! - [`server`] - telnet connections, sessions and player commands
//! - [`storage`] - player persistence
//! - [`config`] - TOML configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   MudServer     │ ← connections, commands, autosave
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Game / Ticks   │ ← scheduler drives subsystem updates
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Combat, Scripts │ ← rules applied to the world
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   World graph   │ ← rooms, livings, items
//! └─────────────────┘
//! ```

pub mod combat;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logutil;
pub mod metrics;
pub mod scripting;
pub mod server;
pub mod storage;
pub mod world;
