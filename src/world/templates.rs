//! Zone template loaders
//!
//! Zones are described in YAML files under the configured zone directory. Each file holds one
//! zone: its room templates, the item and monster templates it defines, and the reset list that
//! repopulates it. Templates are immutable once loaded and shared through `Arc`.
//!
//! Identifiers inside a file are local (`square`, `rat`). Anything that must cross a zone
//! boundary uses the qualified `zone:id` form, which is also how the engine keys templates.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::types::{
    Attributes, DamageRange, Direction, DoorState, LivingFlag, Modifiers, RoomFlag, Sex, SkillSet,
    Slot, Terrain,
};
use crate::errors::GameError;
use crate::scripting::ScriptType;

const BUILTIN_ZONES: &[(&str, &str)] = &[
    ("village.yaml", include_str!("../../data/zones/village.yaml")),
    ("barrow.yaml", include_str!("../../data/zones/barrow.yaml")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// One global instance created at startup.
    #[default]
    Static,
    /// A fresh instance is created whenever someone walks in from outside.
    Dynamic,
}

fn default_reset_minutes() -> u32 {
    15
}

fn default_max() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneTemplate {
    pub name: String,
    #[serde(default)]
    pub kind: ZoneKind,
    #[serde(default = "default_reset_minutes")]
    pub reset_minutes: u32,
    #[serde(default)]
    pub rooms: Vec<RoomTemplate>,
    #[serde(default)]
    pub items: Vec<ItemTemplate>,
    #[serde(default)]
    pub monsters: Vec<MonsterTemplate>,
    #[serde(default)]
    pub resets: Vec<ResetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSpec {
    pub event: ScriptType,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmbientText {
    #[serde(default)]
    pub day: Vec<String>,
    #[serde(default)]
    pub night: Vec<String>,
}

/// Either a bare destination or a destination with a door.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExitSpec {
    To(String),
    Door {
        to: String,
        #[serde(default)]
        door: DoorState,
    },
}

impl ExitSpec {
    pub fn destination(&self) -> &str {
        match self {
            ExitSpec::To(to) => to,
            ExitSpec::Door { to, .. } => to,
        }
    }

    pub fn door(&self) -> DoorState {
        match self {
            ExitSpec::To(_) => DoorState::Open,
            ExitSpec::Door { door, .. } => *door,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub flags: Vec<RoomFlag>,
    #[serde(default)]
    pub exits: BTreeMap<Direction, ExitSpec>,
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
    #[serde(default)]
    pub ambient: AmbientText,
}

impl RoomTemplate {
    pub fn has_flag(&self, flag: RoomFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_outdoors(&self) -> bool {
        !self.has_flag(RoomFlag::Indoors) && self.terrain != Terrain::Inside
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemFlag {
    Container,
    NoTake,
    Magic,
    Corpse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub damage: Option<DamageRange>,
    #[serde(default)]
    pub slot: Option<Slot>,
    #[serde(default)]
    pub flags: Vec<ItemFlag>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
}

impl ItemTemplate {
    pub fn has_flag(&self, flag: ItemFlag) -> bool {
        self.flags.contains(&flag)
    }
}

fn default_level() -> u32 {
    1
}

fn default_attacks() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub sex: Sex,
    pub max_health: i32,
    #[serde(default)]
    pub max_mana: i32,
    /// Experience value at level 1, before level scaling.
    #[serde(default)]
    pub exp: u32,
    pub damage: DamageRange,
    #[serde(default = "default_attacks")]
    pub attacks: u8,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub flags: Vec<LivingFlag>,
    #[serde(default)]
    pub skills: SkillSet,
    #[serde(default)]
    pub faction: Option<String>,
    /// Item template ids equipped at spawn.
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResetSpec {
    Monster {
        monster: String,
        room: String,
        #[serde(default = "default_max")]
        max: usize,
    },
    Item {
        item: String,
        room: String,
        #[serde(default = "default_max")]
        max: usize,
    },
}

/// Qualifies a local id with its zone unless it already names one.
pub fn qualify(zone: &str, id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("{}:{}", zone, id)
    }
}

/// Splits a qualified `zone:id` key.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(':')
}

pub fn parse_zone(source: &str) -> Result<ZoneTemplate, GameError> {
    let zone: ZoneTemplate = serde_yaml::from_str(source)?;
    if zone.name.is_empty() || zone.name.contains(':') {
        return Err(GameError::InvalidState(format!(
            "zone name '{}' must be non-empty and contain no ':'",
            zone.name
        )));
    }
    Ok(zone)
}

/// Load every `*.yaml`/`*.yml` file in `dir`, in file-name order.
pub fn load_zone_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<ZoneTemplate>, GameError> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if is_yaml {
            paths.push(path);
        }
    }
    paths.sort();

    let mut zones = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = fs::read_to_string(&path)?;
        let zone = parse_zone(&contents).map_err(|e| {
            GameError::InvalidState(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!("loaded zone '{}' from {}", zone.name, path.display());
        zones.push(zone);
    }
    Ok(zones)
}

/// Zones compiled into the binary, used when no zone directory is available.
pub fn builtin_zones() -> Result<Vec<ZoneTemplate>, GameError> {
    BUILTIN_ZONES
        .iter()
        .map(|(file, source)| {
            parse_zone(source).map_err(|e| {
                GameError::InvalidState(format!("built-in zone {} is invalid: {}", file, e))
            })
        })
        .collect()
}

/// Load zones from `dir`, falling back to the built-in set when the directory is missing or
/// holds no zone files.
pub fn load_zones_or_builtin<P: AsRef<Path>>(dir: P) -> Result<Vec<ZoneTemplate>, GameError> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        let zones = load_zone_dir(dir)?;
        if !zones.is_empty() {
            info!("loaded {} zone(s) from {}", zones.len(), dir.display());
            return Ok(zones);
        }
    }
    info!(
        "no zone files in {}, using built-in zones",
        dir.display()
    );
    builtin_zones()
}
