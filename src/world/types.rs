use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LivingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Live room instance handle. Static zones own exactly one instance per template,
/// dynamic zones hand out a fresh set of ids per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl fmt::Display for LivingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Accepts full names and the usual single-letter abbreviations.
    pub fn parse(input: &str) -> Option<Direction> {
        match input.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Direction::North),
            "e" | "east" => Some(Direction::East),
            "s" | "south" => Some(Direction::South),
            "w" | "west" => Some(Direction::West),
            "u" | "up" => Some(Direction::Up),
            "d" | "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    #[default]
    Open,
    Closed,
    Locked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RoomFlag {
    /// Monsters never enter, wander or flee into this room.
    NoMonster,
    /// No attacks may start here.
    Safe,
    Indoors,
    Dark,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Inside,
    #[default]
    City,
    Field,
    Forest,
    Hills,
    Mountain,
    Water,
}

impl Terrain {
    pub fn move_cost(self) -> i32 {
        match self {
            Terrain::Inside | Terrain::City => 1,
            Terrain::Field => 2,
            Terrain::Forest => 3,
            Terrain::Hills => 4,
            Terrain::Mountain => 6,
            Terrain::Water => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Head,
    Neck,
    Body,
    Arms,
    Hands,
    Finger,
    Legs,
    Feet,
    Shield,
    Wield,
}

impl Slot {
    pub fn label(self) -> &'static str {
        match self {
            Slot::Head => "<worn on head>",
            Slot::Neck => "<worn around neck>",
            Slot::Body => "<worn on body>",
            Slot::Arms => "<worn on arms>",
            Slot::Hands => "<worn on hands>",
            Slot::Finger => "<worn on finger>",
            Slot::Legs => "<worn on legs>",
            Slot::Feet => "<worn on feet>",
            Slot::Shield => "<worn as shield>",
            Slot::Wield => "<wielded>",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Neutral,
}

impl Sex {
    pub fn subject(self) -> &'static str {
        match self {
            Sex::Male => "he",
            Sex::Female => "she",
            Sex::Neutral => "it",
        }
    }

    pub fn object(self) -> &'static str {
        match self {
            Sex::Male => "him",
            Sex::Female => "her",
            Sex::Neutral => "it",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LivingFlag {
    /// Never wanders out of its spawn room.
    Sentinel,
    /// Attacks players on sight.
    Aggressive,
    /// Flees when badly hurt.
    Wimpy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Str,
    Dex,
    Int,
    Con,
    Hitroll,
    Damroll,
    /// Positive values make the wearer harder to hit and reduce damage taken.
    Armor,
    /// Resistance against spells.
    Saves,
    MaxHealth,
    MaxMana,
}

/// Numeric adjustments keyed by modifier kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(BTreeMap<Modifier, i32>);

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: Modifier, amount: i32) -> Self {
        self.add(kind, amount);
        self
    }

    pub fn add(&mut self, kind: Modifier, amount: i32) {
        *self.0.entry(kind).or_insert(0) += amount;
    }

    pub fn get(&self, kind: Modifier) -> i32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modifier, i32)> + '_ {
        self.0.iter().map(|(kind, amount)| (*kind, *amount))
    }
}

/// Anything that contributes numeric modifiers to a living's effective stats.
pub trait HasModifiers {
    fn modifier(&self, kind: Modifier) -> i32;
}

impl HasModifiers for Modifiers {
    fn modifier(&self, kind: Modifier) -> i32 {
        self.get(kind)
    }
}

/// Sums a modifier across any collection of contributors.
pub fn total_modifier<'a, I, T>(sources: I, kind: Modifier) -> i32
where
    I: IntoIterator<Item = &'a T>,
    T: HasModifiers + 'a + ?Sized,
{
    sources.into_iter().map(|source| source.modifier(kind)).sum()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    pub str: i32,
    pub dex: i32,
    pub int: i32,
    pub con: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            str: 13,
            dex: 13,
            int: 13,
            con: 13,
        }
    }
}

/// Health, mana and movement pools with their maxima.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pools {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub moves: i32,
    pub max_moves: i32,
}

impl Pools {
    pub fn full(max_health: i32, max_mana: i32, max_moves: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            moves: max_moves,
            max_moves,
        }
    }

    /// Subtracts damage, clamping at zero. Returns the amount actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0);
        let before = self.health;
        self.health = (self.health - amount).clamp(0, self.max_health.max(0));
        before - self.health
    }

    /// Adds health without exceeding the maximum. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health - before
    }

    pub fn restore(&mut self, health: i32, mana: i32, moves: i32) {
        self.heal(health);
        self.mana = (self.mana + mana.max(0)).min(self.max_mana);
        self.moves = (self.moves + moves.max(0)).min(self.max_moves);
    }

    pub fn health_percent(&self) -> i32 {
        if self.max_health <= 0 {
            return 0;
        }
        self.health * 100 / self.max_health
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Backstab,
    Disarm,
    Rescue,
    SecondAttack,
    ThirdAttack,
    Dodge,
}

impl SkillKind {
    pub fn name(self) -> &'static str {
        match self {
            SkillKind::Backstab => "backstab",
            SkillKind::Disarm => "disarm",
            SkillKind::Rescue => "rescue",
            SkillKind::SecondAttack => "second attack",
            SkillKind::ThirdAttack => "third attack",
            SkillKind::Dodge => "dodge",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SpellKind {
    MagicMissile,
    Fireball,
    Armor,
    Bless,
    GiantStrength,
    Blindness,
    Poison,
    CureLight,
}

impl SpellKind {
    pub const ALL: [SpellKind; 8] = [
        SpellKind::MagicMissile,
        SpellKind::Fireball,
        SpellKind::Armor,
        SpellKind::Bless,
        SpellKind::GiantStrength,
        SpellKind::Blindness,
        SpellKind::Poison,
        SpellKind::CureLight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpellKind::MagicMissile => "magic missile",
            SpellKind::Fireball => "fireball",
            SpellKind::Armor => "armor",
            SpellKind::Bless => "bless",
            SpellKind::GiantStrength => "giant strength",
            SpellKind::Blindness => "blindness",
            SpellKind::Poison => "poison",
            SpellKind::CureLight => "cure light",
        }
    }

    /// Matches a spell by any unambiguous prefix of its name ("magic", "fire", "cure").
    pub fn parse(input: &str) -> Option<SpellKind> {
        let needle = input.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        SpellKind::ALL
            .iter()
            .copied()
            .find(|spell| spell.name().starts_with(&needle))
    }
}

/// Learned skill levels (0-100) keyed by skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeMap<SkillKind, u8>);

impl SkillSet {
    pub fn level(&self, skill: SkillKind) -> u8 {
        self.0.get(&skill).copied().unwrap_or(0)
    }

    pub fn set(&mut self, skill: SkillKind, level: u8) {
        self.0.insert(skill, level.min(100));
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkillKind, u8)> + '_ {
        self.0.iter().map(|(skill, level)| (*skill, *level))
    }
}

pub type LivingFlags = BTreeSet<LivingFlag>;

/// Inclusive damage range rolled for a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DamageRange {
    pub min: u32,
    pub max: u32,
}

impl DamageRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn normalized(self) -> Self {
        if self.max < self.min {
            Self {
                min: self.max,
                max: self.min,
            }
        } else {
            self
        }
    }
}
