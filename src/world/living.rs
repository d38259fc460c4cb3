use std::collections::BTreeMap;
use std::sync::Arc;

use super::affection::Affections;
use super::templates::MonsterTemplate;
use super::types::{
    Attributes, DamageRange, HasModifiers, ItemId, LivingFlag, LivingFlags, LivingId, Modifier,
    Modifiers, Pools, RoomId, Sex, SkillKind, SkillSet, Slot,
};

/// Natural damage for a living without a weapon.
pub const BARE_HANDS: DamageRange = DamageRange::new(1, 4);

/// Where a reset-spawned entity came from, so zone resets can count what is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpawnRef {
    pub zone: super::graph::ZoneId,
    pub reset: usize,
}

#[derive(Debug, Clone)]
pub enum LivingKind {
    Player,
    Monster(Arc<MonsterTemplate>),
}

/// A player or monster.
///
/// `room` and `target` are plain ids; the world graph owns the actual rooms and the
/// livings they refer to. `dead` latches once the death flow has started so it never runs
/// twice for the same living.
#[derive(Debug, Clone)]
pub struct Living {
    pub id: LivingId,
    pub name: String,
    pub keywords: Vec<String>,
    pub kind: LivingKind,
    pub sex: Sex,
    pub level: u32,
    pub exp: u64,
    pub attributes: Attributes,
    pub pools: Pools,
    pub room: RoomId,
    pub target: Option<LivingId>,
    pub affections: Affections,
    pub equipment: BTreeMap<Slot, ItemId>,
    pub inventory: Vec<ItemId>,
    pub skills: SkillSet,
    pub faction: Option<String>,
    pub flags: LivingFlags,
    /// Innate modifiers (monster templates, class bonuses).
    pub modifiers: Modifiers,
    pub natural_damage: DamageRange,
    pub attacks: u8,
    /// Hit points at or below which a player flees automatically. Zero disables.
    pub wimpy: i32,
    /// Damage dealt to this living, per attacker, since it last recovered to full.
    pub damage_taken: BTreeMap<LivingId, i32>,
    pub spawn: Option<SpawnRef>,
    pub dead: bool,
}

impl Living {
    pub fn new_player(id: LivingId, name: &str, room: RoomId) -> Self {
        Self {
            id,
            name: name.to_string(),
            keywords: vec![name.to_ascii_lowercase()],
            kind: LivingKind::Player,
            sex: Sex::Neutral,
            level: 1,
            exp: 0,
            attributes: Attributes::default(),
            pools: Pools::full(20, 100, 100),
            room,
            target: None,
            affections: Affections::new(),
            equipment: BTreeMap::new(),
            inventory: Vec::new(),
            skills: SkillSet::default(),
            faction: None,
            flags: LivingFlags::new(),
            modifiers: Modifiers::new(),
            natural_damage: BARE_HANDS,
            attacks: 1,
            wimpy: 0,
            damage_taken: BTreeMap::new(),
            spawn: None,
            dead: false,
        }
    }

    pub fn new_monster(id: LivingId, template: Arc<MonsterTemplate>, room: RoomId) -> Self {
        let mut keywords = template.keywords.clone();
        if keywords.is_empty() {
            keywords = template
                .name
                .split_whitespace()
                .map(|word| word.to_ascii_lowercase())
                .collect();
        }
        Self {
            id,
            name: template.name.clone(),
            keywords,
            sex: template.sex,
            level: template.level.max(1),
            exp: 0,
            attributes: template.attributes,
            pools: Pools::full(template.max_health.max(1), template.max_mana, 100),
            room,
            target: None,
            affections: Affections::new(),
            equipment: BTreeMap::new(),
            inventory: Vec::new(),
            skills: template.skills.clone(),
            faction: template.faction.clone(),
            flags: template.flags.iter().copied().collect(),
            modifiers: template.modifiers.clone(),
            natural_damage: template.damage.normalized(),
            attacks: template.attacks.max(1),
            wimpy: 0,
            damage_taken: BTreeMap::new(),
            spawn: None,
            dead: false,
            kind: LivingKind::Monster(template),
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, LivingKind::Player)
    }

    pub fn is_monster(&self) -> bool {
        !self.is_player()
    }

    pub fn template(&self) -> Option<&Arc<MonsterTemplate>> {
        match &self.kind {
            LivingKind::Monster(template) => Some(template),
            LivingKind::Player => None,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.pools.health > 0
    }

    pub fn is_fighting(&self) -> bool {
        self.target.is_some()
    }

    pub fn has_flag(&self, flag: LivingFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn skill(&self, skill: SkillKind) -> u8 {
        self.skills.level(skill)
    }

    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        self.keywords.iter().any(|k| k.starts_with(&keyword))
            || self.name.to_ascii_lowercase().starts_with(&keyword)
    }

    /// Name with the first letter upper-cased, for sentence starts.
    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }

    /// Innate plus affection modifiers. Equipment is added by the world graph, which owns items.
    pub fn own_modifier(&self, kind: Modifier) -> i32 {
        self.modifiers.get(kind) + self.affections.modifier(kind)
    }

    pub fn record_damage(&mut self, from: LivingId, amount: i32) {
        *self.damage_taken.entry(from).or_insert(0) += amount;
    }
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_matching_is_prefix_and_case_insensitive() {
        let living = Living::new_player(LivingId(1), "Aldric", RoomId(1));
        assert!(living.matches("ald"));
        assert!(living.matches("ALDRIC"));
        assert!(!living.matches("bob"));
        assert_eq!(capitalize("a rat"), "A rat");
    }

    #[test]
    fn new_player_starts_alive_and_idle() {
        let living = Living::new_player(LivingId(1), "Mira", RoomId(3));
        assert!(living.is_alive());
        assert!(!living.is_fighting());
        assert!(living.is_player());
        assert_eq!(living.pools.health, living.pools.max_health);
    }
}
