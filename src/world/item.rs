use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::affection::Affections;
use super::living::SpawnRef;
use super::templates::{ItemFlag, ItemTemplate};
use super::types::{DamageRange, HasModifiers, ItemId, LivingId, Modifier, RoomId, Slot};

/// The single container an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocation {
    Room(RoomId),
    Inventory(LivingId),
    Equipped(LivingId, Slot),
    Container(ItemId),
    Nowhere,
}

impl ItemLocation {
    /// The living carrying or wearing the item, if any.
    pub fn holder(&self) -> Option<LivingId> {
        match self {
            ItemLocation::Inventory(id) | ItemLocation::Equipped(id, _) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub template: Arc<ItemTemplate>,
    pub name: String,
    pub keywords: Vec<String>,
    pub location: ItemLocation,
    pub contents: Vec<ItemId>,
    pub affections: Affections,
    /// Removed from the world once this passes (corpses).
    pub decay_at: Option<DateTime<Utc>>,
    pub spawn: Option<SpawnRef>,
}

impl Item {
    pub fn new(id: ItemId, template: Arc<ItemTemplate>) -> Self {
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
            template,
            location: ItemLocation::Nowhere,
            contents: Vec::new(),
            affections: Affections::new(),
            decay_at: None,
            spawn: None,
        }
    }

    pub fn has_flag(&self, flag: ItemFlag) -> bool {
        self.template.has_flag(flag)
    }

    pub fn is_corpse(&self) -> bool {
        self.has_flag(ItemFlag::Corpse)
    }

    pub fn weapon_damage(&self) -> Option<DamageRange> {
        self.template.damage.map(DamageRange::normalized)
    }

    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        self.keywords.iter().any(|k| k.starts_with(&keyword))
    }
}

impl HasModifiers for Item {
    fn modifier(&self, kind: Modifier) -> i32 {
        self.template.modifiers.get(kind) + self.affections.modifier(kind)
    }
}
