//! # Storage Module - Player Persistence
//!
//! Players are the only state that outlives the process. Everything else (rooms, monsters,
//! floor items) is rebuilt from zone templates at startup.
//!
//! ## Layout
//!
//! A single sled database under `storage.data_dir` with one tree:
//!
//! ```text
//! players:<lowercased name>  ← bincode-encoded PlayerRecord
//! ```
//!
//! Every record carries a schema version byte. Records written by a different schema are
//! refused with [`GameError::SchemaMismatch`] rather than decoded into garbage.
//!
//! Carried items are stored by template key (`village:dagger`), so a record stays valid
//! across restarts even though item ids do not. Affections are not persisted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mudengine::storage::{PlayerRepository, PlayerStore};
//!
//! fn main() -> Result<(), mudengine::errors::GameError> {
//!     let store = PlayerStore::open("./data/players")?;
//!     if let Some(record) = store.find_by_name("Alice")? {
//!         println!("{} is level {}", record.name, record.level);
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sled::IVec;

use crate::errors::GameError;
use crate::world::{
    Attributes, ItemLocation, LivingId, Pools, Sex, SkillSet, Slot, World,
};

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

const TREE_PLAYERS: &str = "players";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub schema_version: u8,
    pub name: String,
    pub level: u32,
    pub exp: u64,
    pub sex: Sex,
    pub attributes: Attributes,
    pub pools: Pools,
    pub skills: SkillSet,
    /// Qualified key of the room the player was last in.
    pub room_key: String,
    pub inventory: Vec<String>,
    pub equipment: BTreeMap<Slot, String>,
    pub wimpy: i32,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn new(name: &str, room_key: &str) -> Self {
        let now = Utc::now();
        Self {
            schema_version: PLAYER_SCHEMA_VERSION,
            name: name.to_string(),
            level: 1,
            exp: 0,
            sex: Sex::default(),
            attributes: Attributes::default(),
            pools: Pools::full(20, 100, 100),
            skills: SkillSet::default(),
            room_key: room_key.to_string(),
            inventory: Vec::new(),
            equipment: BTreeMap::new(),
            wimpy: 0,
            created_at: now,
            last_seen: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

/// Lookup and persistence of player records by name (case-insensitive).
pub trait PlayerRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, GameError>;
    fn store(&self, record: &PlayerRecord) -> Result<(), GameError>;
    fn has(&self, name: &str) -> Result<bool, GameError>;
}

/// Sled-backed player store.
pub struct PlayerStore {
    _db: sled::Db,
    players: sled::Tree,
}

impl PlayerStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        debug!("opened player store at {}", path_ref.display());
        Ok(Self { _db: db, players })
    }

    fn players_key(name: &str) -> Vec<u8> {
        format!("players:{}", name.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Names of every stored player, lowercased.
    pub fn list_player_names(&self) -> Result<Vec<String>, GameError> {
        let mut names = Vec::new();
        for entry in self.players.scan_prefix(b"players:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(name) = text.strip_prefix("players:") {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

impl PlayerRepository for PlayerStore {
    fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, GameError> {
        let Some(bytes) = self.players.get(Self::players_key(name))? else {
            return Ok(None);
        };
        let record: PlayerRecord = Self::deserialize(bytes)?;
        if record.schema_version != PLAYER_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "player",
                expected: PLAYER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    fn store(&self, record: &PlayerRecord) -> Result<(), GameError> {
        let mut record = record.clone();
        record.schema_version = PLAYER_SCHEMA_VERSION;
        record.touch();
        let bytes = Self::serialize(&record)?;
        self.players.insert(Self::players_key(&record.name), bytes)?;
        self.players.flush()?;
        Ok(())
    }

    fn has(&self, name: &str) -> Result<bool, GameError> {
        Ok(self.players.contains_key(Self::players_key(name))?)
    }
}

/// Snapshot a live player into a record. `None` if the id is not a player.
pub fn capture(world: &World, id: LivingId, created_at: DateTime<Utc>) -> Option<PlayerRecord> {
    let player = world.living(id).filter(|l| l.is_player())?;
    let room_key = world
        .room(player.room)
        .map(|r| r.key.clone())
        .unwrap_or_default();
    let template_key = |item: &crate::world::ItemId| world.item(*item).map(|i| i.template.id.clone());
    Some(PlayerRecord {
        schema_version: PLAYER_SCHEMA_VERSION,
        name: player.name.clone(),
        level: player.level,
        exp: player.exp,
        sex: player.sex,
        attributes: player.attributes,
        pools: player.pools,
        skills: player.skills.clone(),
        room_key,
        inventory: player.inventory.iter().filter_map(template_key).collect(),
        equipment: player
            .equipment
            .iter()
            .filter_map(|(slot, item)| template_key(item).map(|key| (*slot, key)))
            .collect(),
        wimpy: player.wimpy,
        created_at,
        last_seen: Utc::now(),
    })
}

/// Put a stored player back into the world. Unknown rooms fall back to the start room and
/// unknown item templates are skipped with a warning.
pub fn restore(world: &mut World, record: &PlayerRecord) -> Result<LivingId, GameError> {
    let room = world
        .resolve_room(&record.room_key)
        .unwrap_or(world.start_room);
    let id = world.add_player(&record.name, room)?;
    if let Some(player) = world.living_mut(id) {
        player.level = record.level.max(1);
        player.exp = record.exp;
        player.sex = record.sex;
        player.attributes = record.attributes;
        player.pools = record.pools;
        player.pools.health = player.pools.health.max(1);
        player.skills = record.skills.clone();
        player.wimpy = record.wimpy;
    }
    for key in &record.inventory {
        if let Err(e) = world.spawn_item(key, ItemLocation::Inventory(id)) {
            warn!("dropping {} from {}'s inventory: {}", key, record.name, e);
        }
    }
    for (slot, key) in &record.equipment {
        match world.spawn_item(key, ItemLocation::Inventory(id)) {
            Ok(item) => {
                if let Err(e) = world.move_item(item, ItemLocation::Equipped(id, *slot)) {
                    warn!("{} could not wear {}: {}", record.name, key, e);
                }
            }
            Err(e) => warn!("dropping worn {} from {}: {}", key, record.name, e),
        }
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_player() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        let mut record = PlayerRecord::new("Alice", "village:square");
        record.exp = 4200;
        store.store(&record).expect("store");
        let fetched = store.find_by_name("alice").expect("find").expect("present");
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.exp, 4200);
        assert!(store.has("ALICE").expect("has"));
        assert_eq!(store.list_player_names().expect("list"), vec!["alice".to_string()]);
    }

    #[test]
    fn missing_player_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlayerStore::open(dir.path()).expect("store");
        assert!(store.find_by_name("nobody").expect("find").is_none());
        assert!(!store.has("nobody").expect("has"));
    }
}
