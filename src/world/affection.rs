//! Timed modifiers attached to livings and items.
//!
//! An affection carries an absolute expiry timestamp. `Affections::update` removes every entry
//! whose expiry is at or before `now` and hands them back in removal order so the caller can
//! deliver their expiry callbacks after the list has already been mutated. Forced removal
//! through `clear` never yields callbacks.
//!
//! Stacking is allowed: adding the same spell twice keeps both entries and both contribute
//! their modifiers until each expires on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{HasModifiers, Modifier, Modifiers, SkillKind, SpellKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffectionSource {
    Spell(SpellKind),
    Skill(SkillKind),
}

/// Closed set of things that may happen when an affection runs out on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryCallback {
    /// Text sent to the affected living.
    Message(String),
    /// Text sent to everyone else in the living's room; `@n` is replaced with its name.
    RoomMessage(String),
    /// Text sent to the owner and a room message, as one callback.
    Both { owner: String, room: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affection {
    pub source: AffectionSource,
    pub expires_at: DateTime<Utc>,
    pub modifiers: Modifiers,
    pub on_expire: Option<ExpiryCallback>,
    /// Caster or user level at the time of application.
    pub level: u32,
}

impl Affection {
    pub fn new(source: AffectionSource, expires_at: DateTime<Utc>, modifiers: Modifiers) -> Self {
        Self {
            source,
            expires_at,
            modifiers,
            on_expire: None,
            level: 1,
        }
    }

    pub fn with_callback(mut self, callback: ExpiryCallback) -> Self {
        self.on_expire = Some(callback);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

impl HasModifiers for Affection {
    fn modifier(&self, kind: Modifier) -> i32 {
        self.modifiers.get(kind)
    }
}

/// Ordered list of affections owned by one living or item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affections {
    entries: Vec<Affection>,
}

impl Affections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, affection: Affection) {
        self.entries.push(affection);
    }

    /// Removes every affection expired as of `now` and returns them in removal order.
    /// Calling this twice with the same `now` returns nothing the second time.
    pub fn update(&mut self, now: DateTime<Utc>) -> Vec<Affection> {
        if !self.entries.iter().any(|a| a.is_expired(now)) {
            return Vec::new();
        }
        let (expired, kept): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|a| a.is_expired(now));
        self.entries = kept;
        expired
    }

    pub fn spell(&self, spell: SpellKind) -> Option<&Affection> {
        self.entries
            .iter()
            .find(|a| a.source == AffectionSource::Spell(spell))
    }

    pub fn skill(&self, skill: SkillKind) -> Option<&Affection> {
        self.entries
            .iter()
            .find(|a| a.source == AffectionSource::Skill(skill))
    }

    /// Drops everything without running callbacks.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Affection> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HasModifiers for Affections {
    fn modifier(&self, kind: Modifier) -> i32 {
        self.entries.iter().map(|a| a.modifier(kind)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    fn armor(expires: i64) -> Affection {
        Affection::new(
            AffectionSource::Spell(SpellKind::Armor),
            at(expires),
            Modifiers::new().with(Modifier::Armor, 20),
        )
    }

    #[test]
    fn update_removes_only_expired_in_order() {
        let mut affs = Affections::new();
        affs.add(armor(10).with_callback(ExpiryCallback::Message("first".into())));
        affs.add(armor(30));
        affs.add(armor(5).with_callback(ExpiryCallback::Message("second".into())));

        let expired = affs.update(at(10));
        assert_eq!(expired.len(), 2);
        assert_eq!(
            expired[0].on_expire,
            Some(ExpiryCallback::Message("first".into()))
        );
        assert_eq!(
            expired[1].on_expire,
            Some(ExpiryCallback::Message("second".into()))
        );
        assert_eq!(affs.len(), 1);
    }

    #[test]
    fn second_update_at_same_time_is_empty() {
        let mut affs = Affections::new();
        affs.add(armor(0));
        assert_eq!(affs.update(at(0)).len(), 1);
        assert!(affs.update(at(0)).is_empty());
    }

    #[test]
    fn stacking_sums_modifiers() {
        let mut affs = Affections::new();
        affs.add(armor(100));
        affs.add(armor(100));
        assert_eq!(affs.modifier(Modifier::Armor), 40);
        assert!(affs.spell(SpellKind::Armor).is_some());
        assert!(affs.spell(SpellKind::Bless).is_none());
        assert!(affs.skill(SkillKind::Dodge).is_none());
    }

    #[test]
    fn remaining_seconds_never_negative() {
        let aff = armor(10);
        assert_eq!(aff.remaining_seconds(at(0)), 10);
        assert_eq!(aff.remaining_seconds(at(0) + Duration::seconds(20)), 0);
    }
}
