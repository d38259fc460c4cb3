//! # Configuration Management Module
//!
//! Server configuration is a single TOML file. Every section has sensible defaults, so a file
//! only needs the values it wants to change.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - listener address, tick length and connection limits
//! - [`Cadence`] - how many ticks between passes of each world subsystem
//! - [`CombatConfig`] - damage floor, regeneration and wimpy thresholds
//! - [`WorldConfig`] - zone directory and start room
//! - [`StorageConfig`] - player database location and autosave period
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mudengine::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.bind);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:4000"
//! tick_millis = 100
//!
//! [cadence]
//! fights = 25
//! living = 50
//!
//! [world]
//! zone_dir = "./data/zones"
//! start_room = "village:square"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use crate::engine::scheduler::Cadence;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Length of one scheduler tick.
    pub tick_millis: u64,
    pub max_connections: usize,
    /// Longest accepted input line; longer lines are truncated.
    pub max_line_length: usize,
    pub motd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4000".to_string(),
            tick_millis: 100,
            max_connections: 64,
            max_line_length: 256,
            motd: "Welcome, traveller.".to_string(),
        }
    }
}

/// Tunables for combat and per-living updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatConfig {
    /// Smallest damage a successful hit can do.
    pub min_damage: f64,
    /// Percent of max health restored per living update while not fighting.
    pub health_regen_percent: u32,
    pub mana_regen_percent: u32,
    pub move_regen_percent: u32,
    pub corpse_decay_seconds: i64,
    /// Monsters flagged wimpy flee below this percent of max health.
    pub wimpy_percent: i32,
    /// Chance, per living update, that a non-sentinel monster wanders.
    pub wander_chance: u32,
    /// Chance, per room update, that an occupied room emits an ambient line.
    pub ambient_chance: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            min_damage: 1.0,
            health_regen_percent: 10,
            mana_regen_percent: 10,
            move_regen_percent: 15,
            corpse_decay_seconds: 300,
            wimpy_percent: 20,
            wander_chance: 10,
            ambient_chance: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub zone_dir: String,
    /// Qualified key of the room where new players appear and dead players recover.
    pub start_room: String,
    /// Seed for the world's random source. Unset means seeded from the OS.
    pub random_seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            zone_dir: "./data/zones".to_string(),
            start_room: "village:square".to_string(),
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Seconds between saving every connected player. Zero disables autosave.
    pub autosave_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/players".to_string(),
            autosave_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("mudengine.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.tick_millis == 0 {
            return Err(anyhow!("server.tick_millis must be greater than zero"));
        }
        if self.combat.min_damage < 0.0 {
            return Err(anyhow!("combat.min_damage must not be negative"));
        }
        if !self.world.start_room.contains(':') {
            return Err(anyhow!(
                "world.start_room '{}' must be a qualified zone:room key",
                self.world.start_room
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.tick_millis, 100);
        assert_eq!(config.cadence.fights, 25);
        assert_eq!(config.combat.min_damage, 1.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
bind = "127.0.0.1:5000"

[cadence]
fights = 10
"#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.server.tick_millis, 100);
        assert_eq!(config.cadence.fights, 10);
        assert_eq!(config.cadence.living, 50);
        assert_eq!(config.world.start_room, "village:square");
    }

    #[test]
    fn test_unqualified_start_room_rejected() {
        let mut config = Config::default();
        config.world.start_room = "square".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.combat, CombatConfig::default());
        assert_eq!(parsed.cadence, Cadence::default());
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let config = Config::load(path).await.unwrap();
        assert_eq!(config.storage.autosave_seconds, 300);
    }
}
