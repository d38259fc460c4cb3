//! The live world graph.
//!
//! `World` owns every room instance, living and item. Cross references between them are plain
//! ids, and all containers are `BTreeMap`s keyed by id so iteration order is the order in which
//! things were created. That keeps tick processing deterministic for a fixed random source.
//!
//! Static zones get one instance at startup and their rooms are addressable by qualified key
//! (`village:square`). Dynamic zones have no global instance; an exit that leads into one is
//! stored as `ExitTarget::Dynamic` and resolved by creating a fresh instance when someone walks
//! through it. Empty dynamic instances are torn down by the zone update.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::item::{Item, ItemLocation};
use super::living::{Living, SpawnRef};
use super::templates::{
    qualify, split_key, ItemFlag, ItemTemplate, MonsterTemplate, ResetSpec, RoomTemplate,
    ZoneKind, ZoneTemplate,
};
use super::time::GameTime;
use super::types::{
    Direction, DoorState, HasModifiers, ItemId, LivingId, Modifier, RoomFlag, RoomId, Slot,
};
use crate::errors::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitTarget {
    Room(RoomId),
    /// Leads into a dynamic zone; resolved to a new instance on traversal.
    Dynamic { zone: String, room: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub to: ExitTarget,
    pub door: DoorState,
}

impl Exit {
    pub fn is_open(&self) -> bool {
        self.door == DoorState::Open
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub zone: ZoneId,
    /// Qualified template key (`zone:room`).
    pub key: String,
    pub template: Arc<RoomTemplate>,
    pub exits: BTreeMap<Direction, Exit>,
    pub occupants: Vec<LivingId>,
    pub items: Vec<ItemId>,
}

impl Room {
    pub fn has_flag(&self, flag: RoomFlag) -> bool {
        self.template.has_flag(flag)
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }
}

#[derive(Debug, Clone)]
pub struct ZoneState {
    pub id: ZoneId,
    pub template: Arc<ZoneTemplate>,
    /// Local room id to instance id.
    pub rooms: BTreeMap<String, RoomId>,
    pub last_reset: DateTime<Utc>,
}

impl ZoneState {
    pub fn is_dynamic(&self) -> bool {
        self.template.kind == ZoneKind::Dynamic
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }
}

pub struct World {
    rooms: BTreeMap<RoomId, Room>,
    livings: BTreeMap<LivingId, Living>,
    items: BTreeMap<ItemId, Item>,
    zones: BTreeMap<ZoneId, ZoneState>,
    room_index: HashMap<String, RoomId>,
    zone_templates: BTreeMap<String, Arc<ZoneTemplate>>,
    room_templates: HashMap<String, Arc<RoomTemplate>>,
    item_templates: HashMap<String, Arc<ItemTemplate>>,
    monster_templates: HashMap<String, Arc<MonsterTemplate>>,
    corpse_template: Arc<ItemTemplate>,
    next_living: u64,
    next_item: u64,
    next_room: u32,
    next_zone: u32,
    /// Monsters spawned since the last `take_spawned`, awaiting their `Init` hook.
    spawned: Vec<LivingId>,
    pub time: GameTime,
    pub start_room: RoomId,
}

impl World {
    fn empty() -> Self {
        let corpse_template = Arc::new(ItemTemplate {
            id: "corpse".to_string(),
            name: "a corpse".to_string(),
            keywords: vec!["corpse".to_string()],
            description: String::new(),
            weight: 100,
            cost: 0,
            damage: None,
            slot: None,
            flags: vec![ItemFlag::Corpse, ItemFlag::Container, ItemFlag::NoTake],
            modifiers: Default::default(),
            scripts: Vec::new(),
        });
        Self {
            rooms: BTreeMap::new(),
            livings: BTreeMap::new(),
            items: BTreeMap::new(),
            zones: BTreeMap::new(),
            room_index: HashMap::new(),
            zone_templates: BTreeMap::new(),
            room_templates: HashMap::new(),
            item_templates: HashMap::new(),
            monster_templates: HashMap::new(),
            corpse_template,
            next_living: 1,
            next_item: 1,
            next_room: 1,
            next_zone: 1,
            spawned: Vec::new(),
            time: GameTime::default(),
            start_room: RoomId(0),
        }
    }

    /// Register the zone templates, instantiate every static zone and run its first reset.
    /// Any dangling exit, reset or template reference is reported as an error.
    pub fn from_zones(
        zones: Vec<ZoneTemplate>,
        start_room: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, GameError> {
        let mut world = World::empty();
        for zone in zones {
            world.register_zone(zone)?;
        }
        world.validate_templates()?;

        let statics: Vec<Arc<ZoneTemplate>> = world
            .zone_templates
            .values()
            .filter(|z| z.kind == ZoneKind::Static)
            .cloned()
            .collect();
        let mut created = Vec::with_capacity(statics.len());
        for zone in statics {
            created.push(world.create_zone_rooms(zone, now));
        }
        for zone_id in &created {
            world.link_zone_exits(*zone_id)?;
        }

        world.start_room = world
            .resolve_room(start_room)
            .ok_or_else(|| GameError::NotFound(format!("start room '{}'", start_room)))?;

        for zone_id in created {
            world.reset_zone(zone_id, now)?;
        }
        Ok(world)
    }

    fn register_zone(&mut self, zone: ZoneTemplate) -> Result<(), GameError> {
        if self.zone_templates.contains_key(&zone.name) {
            return Err(GameError::InvalidState(format!(
                "duplicate zone '{}'",
                zone.name
            )));
        }
        for room in &zone.rooms {
            let key = qualify(&zone.name, &room.id);
            if self
                .room_templates
                .insert(key.clone(), Arc::new(room.clone()))
                .is_some()
            {
                return Err(GameError::InvalidState(format!("duplicate room '{}'", key)));
            }
        }
        // Item and monster templates carry their qualified key from here on.
        for item in &zone.items {
            let mut item = item.clone();
            item.id = qualify(&zone.name, &item.id);
            self.item_templates.insert(item.id.clone(), Arc::new(item));
        }
        for monster in &zone.monsters {
            let mut monster = monster.clone();
            monster.id = qualify(&zone.name, &monster.id);
            self.monster_templates
                .insert(monster.id.clone(), Arc::new(monster));
        }
        debug!(
            "registered zone '{}' ({} rooms, {} items, {} monsters)",
            zone.name,
            zone.rooms.len(),
            zone.items.len(),
            zone.monsters.len()
        );
        self.zone_templates
            .insert(zone.name.clone(), Arc::new(zone));
        Ok(())
    }

    fn validate_templates(&self) -> Result<(), GameError> {
        for zone in self.zone_templates.values() {
            for room in &zone.rooms {
                for (dir, exit) in &room.exits {
                    let key = qualify(&zone.name, exit.destination());
                    if !self.room_templates.contains_key(&key) {
                        return Err(GameError::InvalidState(format!(
                            "exit {} of {}:{} leads to unknown room '{}'",
                            dir, zone.name, room.id, key
                        )));
                    }
                }
            }
            for monster in &zone.monsters {
                for item in &monster.equipment {
                    let key = qualify(&zone.name, item);
                    if !self.item_templates.contains_key(&key) {
                        return Err(GameError::InvalidState(format!(
                            "monster {}:{} equips unknown item '{}'",
                            zone.name, monster.id, key
                        )));
                    }
                }
            }
            for reset in &zone.resets {
                let (room, known) = match reset {
                    ResetSpec::Monster { monster, room, .. } => (
                        room,
                        self.monster_templates
                            .contains_key(&qualify(&zone.name, monster)),
                    ),
                    ResetSpec::Item { item, room, .. } => (
                        room,
                        self.item_templates.contains_key(&qualify(&zone.name, item)),
                    ),
                };
                if !known || !zone.rooms.iter().any(|r| &r.id == room) {
                    return Err(GameError::InvalidState(format!(
                        "zone '{}' has a reset with an unknown template or room: {:?}",
                        zone.name, reset
                    )));
                }
            }
        }
        Ok(())
    }

    fn create_zone_rooms(&mut self, template: Arc<ZoneTemplate>, now: DateTime<Utc>) -> ZoneId {
        let zone_id = ZoneId(self.next_zone);
        self.next_zone += 1;
        let mut rooms = BTreeMap::new();
        for room in &template.rooms {
            let id = RoomId(self.next_room);
            self.next_room += 1;
            let key = qualify(&template.name, &room.id);
            let room_template = self
                .room_templates
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Arc::new(room.clone()));
            self.rooms.insert(
                id,
                Room {
                    id,
                    zone: zone_id,
                    key: key.clone(),
                    template: room_template,
                    exits: BTreeMap::new(),
                    occupants: Vec::new(),
                    items: Vec::new(),
                },
            );
            if template.kind == ZoneKind::Static {
                self.room_index.insert(key, id);
            }
            rooms.insert(room.id.clone(), id);
        }
        self.zones.insert(
            zone_id,
            ZoneState {
                id: zone_id,
                template,
                rooms,
                last_reset: now,
            },
        );
        zone_id
    }

    fn link_zone_exits(&mut self, zone_id: ZoneId) -> Result<(), GameError> {
        let zone = self
            .zones
            .get(&zone_id)
            .ok_or_else(|| GameError::NotFound(format!("zone {:?}", zone_id)))?;
        let zone_name = zone.template.name.clone();
        let local_rooms = zone.rooms.clone();

        for room_id in local_rooms.values() {
            let template = match self.rooms.get(room_id) {
                Some(room) => room.template.clone(),
                None => continue,
            };
            let mut exits = BTreeMap::new();
            for (dir, spec) in &template.exits {
                let key = qualify(&zone_name, spec.destination());
                let (target_zone, target_room) = split_key(&key)
                    .ok_or_else(|| GameError::InvalidState(format!("bad exit key '{}'", key)))?;
                let to = if target_zone == zone_name {
                    let id = local_rooms.get(target_room).ok_or_else(|| {
                        GameError::NotFound(format!("room '{}' in zone '{}'", target_room, zone_name))
                    })?;
                    ExitTarget::Room(*id)
                } else {
                    match self.zone_templates.get(target_zone).map(|z| z.kind) {
                        Some(ZoneKind::Static) => {
                            let id = self.room_index.get(&key).ok_or_else(|| {
                                GameError::NotFound(format!("room '{}'", key))
                            })?;
                            ExitTarget::Room(*id)
                        }
                        Some(ZoneKind::Dynamic) => ExitTarget::Dynamic {
                            zone: target_zone.to_string(),
                            room: target_room.to_string(),
                        },
                        None => {
                            return Err(GameError::NotFound(format!("zone '{}'", target_zone)))
                        }
                    }
                };
                exits.insert(
                    *dir,
                    Exit {
                        to,
                        door: spec.door(),
                    },
                );
            }
            if let Some(room) = self.rooms.get_mut(room_id) {
                room.exits = exits;
            }
        }
        Ok(())
    }

    /// Create a fresh instance of a dynamic zone and populate it.
    pub fn instantiate_zone(&mut self, name: &str, now: DateTime<Utc>) -> Result<ZoneId, GameError> {
        let template = self
            .zone_templates
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("zone '{}'", name)))?;
        if template.kind != ZoneKind::Dynamic {
            return Err(GameError::InvalidState(format!(
                "zone '{}' is static and already instantiated",
                name
            )));
        }
        let zone_id = self.create_zone_rooms(template, now);
        self.link_zone_exits(zone_id)?;
        self.reset_zone(zone_id, now)?;
        debug!("instantiated dynamic zone '{}' as {:?}", name, zone_id);
        Ok(zone_id)
    }

    /// Tear down a zone instance: its monsters, floor items and rooms. Players still inside
    /// are moved to the start room first.
    pub fn destroy_zone(&mut self, zone_id: ZoneId) -> Result<(), GameError> {
        let zone = self
            .zones
            .remove(&zone_id)
            .ok_or_else(|| GameError::NotFound(format!("zone {:?}", zone_id)))?;
        for room_id in zone.rooms.values() {
            let (occupants, items) = match self.rooms.get(room_id) {
                Some(room) => (room.occupants.clone(), room.items.clone()),
                None => continue,
            };
            for id in occupants {
                let is_player = self.livings.get(&id).map(Living::is_player).unwrap_or(false);
                if is_player {
                    warn!("moving {} out of zone instance being destroyed", id);
                    self.move_living(id, self.start_room)?;
                } else {
                    self.remove_living(id);
                }
            }
            for id in items {
                self.remove_item(id);
            }
            self.rooms.remove(room_id);
        }
        debug!("destroyed zone instance {:?} ('{}')", zone_id, zone.template.name);
        Ok(())
    }

    /// Respawn whatever the zone's reset list says is missing.
    pub fn reset_zone(&mut self, zone_id: ZoneId, now: DateTime<Utc>) -> Result<(), GameError> {
        let zone = self
            .zones
            .get(&zone_id)
            .ok_or_else(|| GameError::NotFound(format!("zone {:?}", zone_id)))?;
        let template = zone.template.clone();
        let rooms = zone.rooms.clone();

        for (index, reset) in template.resets.iter().enumerate() {
            let spawn = SpawnRef {
                zone: zone_id,
                reset: index,
            };
            match reset {
                ResetSpec::Monster { monster, room, max } => {
                    let room_id = *rooms
                        .get(room)
                        .ok_or_else(|| GameError::NotFound(format!("room '{}'", room)))?;
                    let alive = self
                        .livings
                        .values()
                        .filter(|l| l.spawn == Some(spawn) && !l.dead)
                        .count();
                    let key = qualify(&template.name, monster);
                    for _ in alive..*max {
                        self.spawn_monster(&key, room_id, Some(spawn))?;
                    }
                }
                ResetSpec::Item { item, room, max } => {
                    let room_id = *rooms
                        .get(room)
                        .ok_or_else(|| GameError::NotFound(format!("room '{}'", room)))?;
                    let present = self
                        .rooms
                        .get(&room_id)
                        .map(|r| {
                            r.items
                                .iter()
                                .filter(|id| {
                                    self.items.get(id).and_then(|i| i.spawn) == Some(spawn)
                                })
                                .count()
                        })
                        .unwrap_or(0);
                    let key = qualify(&template.name, item);
                    for _ in present..*max {
                        let id = self.spawn_item(&key, ItemLocation::Room(room_id))?;
                        if let Some(item) = self.items.get_mut(&id) {
                            item.spawn = Some(spawn);
                        }
                    }
                }
            }
        }
        if let Some(zone) = self.zones.get_mut(&zone_id) {
            zone.last_reset = now;
        }
        Ok(())
    }

    // ----- lookups -----------------------------------------------------------------------

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn living(&self, id: LivingId) -> Option<&Living> {
        self.livings.get(&id)
    }

    pub fn living_mut(&mut self, id: LivingId) -> Option<&mut Living> {
        self.livings.get_mut(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneState> {
        self.zones.get(&id)
    }

    pub fn resolve_room(&self, key: &str) -> Option<RoomId> {
        self.room_index.get(key).copied()
    }

    pub fn room_template(&self, key: &str) -> Option<&Arc<RoomTemplate>> {
        self.room_templates.get(key)
    }

    pub fn item_template(&self, key: &str) -> Option<&Arc<ItemTemplate>> {
        self.item_templates.get(key)
    }

    pub fn monster_template(&self, key: &str) -> Option<&Arc<MonsterTemplate>> {
        self.monster_templates.get(key)
    }

    pub fn living_ids(&self) -> Vec<LivingId> {
        self.livings.keys().copied().collect()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.keys().copied().collect()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.keys().copied().collect()
    }

    pub fn livings(&self) -> impl Iterator<Item = &Living> {
        self.livings.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &Living> {
        self.livings.values().filter(|l| l.is_player())
    }

    pub fn find_player(&self, name: &str) -> Option<LivingId> {
        self.players()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.id)
    }

    pub fn players_in_room(&self, room: RoomId) -> Vec<LivingId> {
        self.rooms
            .get(&room)
            .map(|r| {
                r.occupants
                    .iter()
                    .copied()
                    .filter(|id| self.livings.get(id).map(Living::is_player).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn zone_has_players(&self, zone_id: ZoneId) -> bool {
        self.zones
            .get(&zone_id)
            .map(|z| {
                z.rooms
                    .values()
                    .any(|room| !self.players_in_room(*room).is_empty())
            })
            .unwrap_or(false)
    }

    /// First living in `room` matching `keyword`, skipping `exclude`. Accepts `2.rat` style
    /// ordinals.
    pub fn find_living_in_room(
        &self,
        room: RoomId,
        keyword: &str,
        exclude: Option<LivingId>,
    ) -> Option<LivingId> {
        let (mut skip, keyword) = split_ordinal(keyword);
        let room = self.rooms.get(&room)?;
        for id in &room.occupants {
            if Some(*id) == exclude {
                continue;
            }
            if let Some(living) = self.livings.get(id) {
                if living.matches(keyword) {
                    if skip == 0 {
                        return Some(*id);
                    }
                    skip -= 1;
                }
            }
        }
        None
    }

    pub fn find_item_in(&self, list: &[ItemId], keyword: &str) -> Option<ItemId> {
        let (mut skip, keyword) = split_ordinal(keyword);
        for id in list {
            if let Some(item) = self.items.get(id) {
                if item.matches(keyword) {
                    if skip == 0 {
                        return Some(*id);
                    }
                    skip -= 1;
                }
            }
        }
        None
    }

    // ----- livings -----------------------------------------------------------------------

    fn next_living_id(&mut self) -> LivingId {
        let id = LivingId(self.next_living);
        self.next_living += 1;
        id
    }

    fn next_item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub fn add_player(&mut self, name: &str, room: RoomId) -> Result<LivingId, GameError> {
        if !self.rooms.contains_key(&room) {
            return Err(GameError::NotFound(format!("room {}", room)));
        }
        let id = self.next_living_id();
        self.livings.insert(id, Living::new_player(id, name, room));
        if let Some(r) = self.rooms.get_mut(&room) {
            r.occupants.push(id);
        }
        Ok(id)
    }

    pub fn spawn_monster(
        &mut self,
        key: &str,
        room: RoomId,
        spawn: Option<SpawnRef>,
    ) -> Result<LivingId, GameError> {
        let template = self
            .monster_templates
            .get(key)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("monster template '{}'", key)))?;
        if !self.rooms.contains_key(&room) {
            return Err(GameError::NotFound(format!("room {}", room)));
        }
        let id = self.next_living_id();
        let mut living = Living::new_monster(id, template.clone(), room);
        living.spawn = spawn;
        self.livings.insert(id, living);
        self.spawned.push(id);
        if let Some(r) = self.rooms.get_mut(&room) {
            r.occupants.push(id);
        }

        let zone = split_key(key).map(|(zone, _)| zone.to_string()).unwrap_or_default();
        for item in &template.equipment {
            let item_key = qualify(&zone, item);
            let item_id = self.spawn_item(&item_key, ItemLocation::Inventory(id))?;
            if self.equip(id, item_id).is_err() {
                debug!("{} keeps {} in inventory", id, item_key);
            }
        }
        Ok(id)
    }

    /// Drain the monsters spawned since the last call, oldest first.
    pub fn take_spawned(&mut self) -> Vec<LivingId> {
        std::mem::take(&mut self.spawned)
    }

    pub fn move_living(&mut self, id: LivingId, to: RoomId) -> Result<(), GameError> {
        if !self.rooms.contains_key(&to) {
            return Err(GameError::NotFound(format!("room {}", to)));
        }
        let living = self
            .livings
            .get_mut(&id)
            .ok_or_else(|| GameError::NotFound(format!("living {}", id)))?;
        let from = living.room;
        living.room = to;
        if let Some(room) = self.rooms.get_mut(&from) {
            room.occupants.retain(|other| *other != id);
        }
        if let Some(room) = self.rooms.get_mut(&to) {
            room.occupants.push(id);
        }
        Ok(())
    }

    /// Remove a living and everything it carries from the world.
    pub fn remove_living(&mut self, id: LivingId) -> Option<Living> {
        self.stop_fighting(id);
        let living = self.livings.remove(&id)?;
        if let Some(room) = self.rooms.get_mut(&living.room) {
            room.occupants.retain(|other| *other != id);
        }
        let carried: Vec<ItemId> = living
            .equipment
            .values()
            .copied()
            .chain(living.inventory.iter().copied())
            .collect();
        for item in carried {
            self.remove_item(item);
        }
        Some(living)
    }

    /// Clear `id`'s target and every target pointing at `id`.
    pub fn stop_fighting(&mut self, id: LivingId) {
        if let Some(living) = self.livings.get_mut(&id) {
            living.target = None;
        }
        for other in self.livings.values_mut() {
            if other.target == Some(id) {
                other.target = None;
            }
        }
    }

    pub fn attackers_of(&self, id: LivingId) -> Vec<LivingId> {
        self.livings
            .values()
            .filter(|l| l.target == Some(id))
            .map(|l| l.id)
            .collect()
    }

    /// Both alive, distinct and in the same room.
    pub fn valid_target(&self, attacker: LivingId, target: LivingId) -> bool {
        if attacker == target {
            return false;
        }
        match (self.livings.get(&attacker), self.livings.get(&target)) {
            (Some(a), Some(t)) => a.is_alive() && t.is_alive() && a.room == t.room,
            _ => false,
        }
    }

    /// Effective modifier: innate, affections and everything equipped.
    pub fn modifier(&self, id: LivingId, kind: Modifier) -> i32 {
        let living = match self.livings.get(&id) {
            Some(living) => living,
            None => return 0,
        };
        let worn: Vec<&Item> = living
            .equipment
            .values()
            .filter_map(|item| self.items.get(item))
            .collect();
        living.own_modifier(kind) + worn.iter().map(|item| item.modifier(kind)).sum::<i32>()
    }

    pub fn wielded(&self, id: LivingId) -> Option<&Item> {
        let living = self.livings.get(&id)?;
        let item = living.equipment.get(&Slot::Wield)?;
        self.items.get(item)
    }

    // ----- items -------------------------------------------------------------------------

    pub fn spawn_item(&mut self, key: &str, location: ItemLocation) -> Result<ItemId, GameError> {
        let template = self
            .item_templates
            .get(key)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("item template '{}'", key)))?;
        let id = self.next_item_id();
        self.items.insert(id, Item::new(id, template));
        if let Err(e) = self.move_item(id, location) {
            self.items.remove(&id);
            return Err(e);
        }
        Ok(id)
    }

    /// Move an item to a new container, detaching it from the old one.
    pub fn move_item(&mut self, id: ItemId, to: ItemLocation) -> Result<(), GameError> {
        let from = self
            .items
            .get(&id)
            .ok_or_else(|| GameError::NotFound(format!("item {}", id)))?
            .location;
        self.check_location(id, to)?;
        self.detach_item(id, from);
        match to {
            ItemLocation::Room(room) => {
                if let Some(r) = self.rooms.get_mut(&room) {
                    r.items.push(id);
                }
            }
            ItemLocation::Inventory(living) => {
                if let Some(l) = self.livings.get_mut(&living) {
                    l.inventory.push(id);
                }
            }
            ItemLocation::Equipped(living, slot) => {
                if let Some(l) = self.livings.get_mut(&living) {
                    l.equipment.insert(slot, id);
                }
            }
            ItemLocation::Container(container) => {
                if let Some(c) = self.items.get_mut(&container) {
                    c.contents.push(id);
                }
            }
            ItemLocation::Nowhere => {}
        }
        if let Some(item) = self.items.get_mut(&id) {
            item.location = to;
        }
        Ok(())
    }

    fn check_location(&self, id: ItemId, to: ItemLocation) -> Result<(), GameError> {
        match to {
            ItemLocation::Room(room) if !self.rooms.contains_key(&room) => {
                Err(GameError::NotFound(format!("room {}", room)))
            }
            ItemLocation::Inventory(living) if !self.livings.contains_key(&living) => {
                Err(GameError::NotFound(format!("living {}", living)))
            }
            ItemLocation::Equipped(living, slot) => match self.livings.get(&living) {
                None => Err(GameError::NotFound(format!("living {}", living))),
                Some(l) if l.equipment.get(&slot).is_some_and(|other| *other != id) => Err(
                    GameError::InvalidState(format!("{} already wears something {:?}", living, slot)),
                ),
                Some(_) => Ok(()),
            },
            ItemLocation::Container(container) => {
                if container == id {
                    return Err(GameError::InvalidState(format!(
                        "{} cannot contain itself",
                        id
                    )));
                }
                match self.items.get(&container) {
                    Some(c) if c.has_flag(ItemFlag::Container) => Ok(()),
                    Some(_) => Err(GameError::InvalidState(format!(
                        "{} is not a container",
                        container
                    ))),
                    None => Err(GameError::NotFound(format!("item {}", container))),
                }
            }
            _ => Ok(()),
        }
    }

    fn detach_item(&mut self, id: ItemId, from: ItemLocation) {
        match from {
            ItemLocation::Room(room) => {
                if let Some(r) = self.rooms.get_mut(&room) {
                    r.items.retain(|other| *other != id);
                }
            }
            ItemLocation::Inventory(living) => {
                if let Some(l) = self.livings.get_mut(&living) {
                    l.inventory.retain(|other| *other != id);
                }
            }
            ItemLocation::Equipped(living, slot) => {
                if let Some(l) = self.livings.get_mut(&living) {
                    if l.equipment.get(&slot) == Some(&id) {
                        l.equipment.remove(&slot);
                    }
                }
            }
            ItemLocation::Container(container) => {
                if let Some(c) = self.items.get_mut(&container) {
                    c.contents.retain(|other| *other != id);
                }
            }
            ItemLocation::Nowhere => {}
        }
    }

    /// Remove an item and, recursively, everything inside it.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let location = self.items.get(&id)?.location;
        self.detach_item(id, location);
        let item = self.items.remove(&id)?;
        for inner in &item.contents {
            self.remove_item(*inner);
        }
        Some(item)
    }

    /// Wear or wield an item from the living's inventory in its template slot.
    pub fn equip(&mut self, living: LivingId, item: ItemId) -> Result<Slot, GameError> {
        let slot = self
            .items
            .get(&item)
            .ok_or_else(|| GameError::NotFound(format!("item {}", item)))?
            .template
            .slot
            .ok_or_else(|| GameError::InvalidState(format!("{} cannot be worn", item)))?;
        self.move_item(item, ItemLocation::Equipped(living, slot))?;
        Ok(slot)
    }

    pub fn unequip(&mut self, living: LivingId, slot: Slot) -> Result<ItemId, GameError> {
        let item = self
            .livings
            .get(&living)
            .and_then(|l| l.equipment.get(&slot).copied())
            .ok_or_else(|| GameError::NotFound(format!("nothing worn {:?}", slot)))?;
        self.move_item(item, ItemLocation::Inventory(living))?;
        Ok(item)
    }

    /// Leave a corpse in the victim's room. Monsters drop everything they carried into it.
    pub fn make_corpse(
        &mut self,
        victim: LivingId,
        decay_at: DateTime<Utc>,
    ) -> Result<ItemId, GameError> {
        let living = self
            .livings
            .get(&victim)
            .ok_or_else(|| GameError::NotFound(format!("living {}", victim)))?;
        let room = living.room;
        let name = format!("the corpse of {}", living.name);
        let mut keywords = vec!["corpse".to_string()];
        keywords.extend(living.keywords.iter().cloned());
        let loot: Vec<ItemId> = if living.is_monster() {
            living
                .equipment
                .values()
                .copied()
                .chain(living.inventory.iter().copied())
                .collect()
        } else {
            Vec::new()
        };

        let id = self.next_item_id();
        let mut corpse = Item::new(id, self.corpse_template.clone());
        corpse.name = name;
        corpse.keywords = keywords;
        corpse.decay_at = Some(decay_at);
        self.items.insert(id, corpse);
        self.move_item(id, ItemLocation::Room(room))?;
        for item in loot {
            self.move_item(item, ItemLocation::Container(id))?;
        }
        Ok(id)
    }

    // ----- exits -------------------------------------------------------------------------

    pub fn exit(&self, room: RoomId, dir: Direction) -> Option<&Exit> {
        self.rooms.get(&room)?.exits.get(&dir)
    }

    /// Template of the room an exit leads to, without instantiating dynamic zones.
    pub fn exit_destination_template(&self, room: RoomId, dir: Direction) -> Option<Arc<RoomTemplate>> {
        match &self.exit(room, dir)?.to {
            ExitTarget::Room(id) => self.rooms.get(id).map(|r| r.template.clone()),
            ExitTarget::Dynamic { zone, room } => {
                self.room_templates.get(&qualify(zone, room)).cloned()
            }
        }
    }

    /// Resolve an exit to a concrete room, creating a dynamic zone instance when needed.
    /// Closed doors are the caller's concern.
    pub fn traverse(
        &mut self,
        room: RoomId,
        dir: Direction,
        now: DateTime<Utc>,
    ) -> Result<Option<RoomId>, GameError> {
        let target = match self.exit(room, dir) {
            Some(exit) => exit.to.clone(),
            None => return Ok(None),
        };
        match target {
            ExitTarget::Room(id) => Ok(Some(id)),
            ExitTarget::Dynamic { zone, room } => {
                let zone_id = self.instantiate_zone(&zone, now)?;
                let id = self
                    .zones
                    .get(&zone_id)
                    .and_then(|z| z.rooms.get(&room).copied())
                    .ok_or_else(|| GameError::NotFound(format!("room '{}:{}'", zone, room)))?;
                Ok(Some(id))
            }
        }
    }

    /// Set a door and the matching door on the far side, when the far side leads back.
    pub fn set_door(&mut self, room: RoomId, dir: Direction, state: DoorState) -> Result<(), GameError> {
        let exit = self
            .rooms
            .get_mut(&room)
            .and_then(|r| r.exits.get_mut(&dir))
            .ok_or_else(|| GameError::NotFound(format!("exit {} from {}", dir, room)))?;
        exit.door = state;
        if let ExitTarget::Room(other) = exit.to.clone() {
            if let Some(back) = self
                .rooms
                .get_mut(&other)
                .and_then(|r| r.exits.get_mut(&dir.opposite()))
            {
                if back.to == ExitTarget::Room(room) {
                    back.door = state;
                }
            }
        }
        Ok(())
    }
}

fn split_ordinal(keyword: &str) -> (usize, &str) {
    if let Some((count, rest)) = keyword.split_once('.') {
        if let Ok(n) = count.parse::<usize>() {
            return (n.saturating_sub(1), rest);
        }
    }
    (0, keyword)
}
