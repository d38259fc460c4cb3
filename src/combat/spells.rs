//! Spell catalogue and casting.
//!
//! Every spell costs mana up front. Offensive spells roll against the target's saves with
//! [`can_hit_magic`](super::can_hit_magic) and, once cast, start a fight like any attack.
//! Buffs and debuffs attach an [`Affection`] that expires on its own and reports back
//! through its expiry callback.

use chrono::Duration;
use log::debug;

use super::{apply_damage, can_hit_magic, engage, special_attack, AttackOutcome, CombatStats};
use crate::engine::act::{act, Audience};
use crate::engine::context::GameContext;
use crate::world::{
    Affection, AffectionSource, ExpiryCallback, LivingId, Modifier, Modifiers, SpellKind, World,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellClass {
    /// Damages the target.
    Attack,
    /// Harmful affection; needs an opponent.
    Curse,
    /// Helpful affection; defaults to the caster.
    Blessing,
    Heal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellInfo {
    pub kind: SpellKind,
    pub mana: i32,
    pub class: SpellClass,
    /// Base affection length; each caster level adds ten more seconds.
    pub duration_secs: i64,
}

pub fn spell_info(kind: SpellKind) -> SpellInfo {
    let (mana, class, duration_secs) = match kind {
        SpellKind::MagicMissile => (10, SpellClass::Attack, 0),
        SpellKind::Fireball => (30, SpellClass::Attack, 0),
        SpellKind::Armor => (10, SpellClass::Blessing, 240),
        SpellKind::Bless => (10, SpellClass::Blessing, 180),
        SpellKind::GiantStrength => (20, SpellClass::Blessing, 180),
        SpellKind::Blindness => (15, SpellClass::Curse, 60),
        SpellKind::Poison => (15, SpellClass::Curse, 90),
        SpellKind::CureLight => (10, SpellClass::Heal, 0),
    };
    SpellInfo {
        kind,
        mana,
        class,
        duration_secs,
    }
}

/// Affection a spell leaves behind, if any.
pub fn spell_affection(kind: SpellKind, level: u32, now: chrono::DateTime<chrono::Utc>) -> Option<Affection> {
    let info = spell_info(kind);
    let expires_at = now + Duration::seconds(info.duration_secs + 10 * i64::from(level));
    let (modifiers, callback) = match kind {
        SpellKind::Armor => (
            Modifiers::new().with(Modifier::Armor, 20),
            ExpiryCallback::Message("You feel less protected.".into()),
        ),
        SpellKind::Bless => (
            Modifiers::new().with(Modifier::Hitroll, 2).with(Modifier::Saves, 2),
            ExpiryCallback::Message("You feel less righteous.".into()),
        ),
        SpellKind::GiantStrength => (
            Modifiers::new().with(Modifier::Str, 2),
            ExpiryCallback::Both {
                owner: "You feel weaker.".into(),
                room: "@n seems to shrink a little.".into(),
            },
        ),
        SpellKind::Blindness => (
            Modifiers::new().with(Modifier::Hitroll, -4).with(Modifier::Armor, -10),
            ExpiryCallback::Message("You can see again.".into()),
        ),
        SpellKind::Poison => (
            Modifiers::new().with(Modifier::Str, -2),
            ExpiryCallback::Both {
                owner: "You feel less sick.".into(),
                room: "@n looks better.".into(),
            },
        ),
        SpellKind::MagicMissile | SpellKind::Fireball | SpellKind::CureLight => return None,
    };
    Some(
        Affection::new(AffectionSource::Spell(kind), expires_at, modifiers)
            .with_callback(callback)
            .with_level(level),
    )
}

/// Damage per living update while poisoned.
pub fn poison_damage(caster_level: u32) -> i32 {
    (caster_level / 4 + 1) as i32
}

#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    NotEnoughMana { needed: i32 },
    NoTarget,
    Resisted,
    Damage(AttackOutcome),
    Affected,
    Healed(i32),
}

fn resolve_target(
    world: &World,
    caster: LivingId,
    class: SpellClass,
    target: Option<LivingId>,
) -> Option<LivingId> {
    match class {
        SpellClass::Attack | SpellClass::Curse => {
            let target = target.or_else(|| world.living(caster).and_then(|c| c.target))?;
            world.valid_target(caster, target).then_some(target)
        }
        SpellClass::Blessing | SpellClass::Heal => match target {
            None => Some(caster),
            Some(t) if t == caster => Some(caster),
            Some(t) => world.valid_target(caster, t).then_some(t),
        },
    }
}

pub fn cast(
    world: &mut World,
    ctx: &mut GameContext,
    caster: LivingId,
    spell: SpellKind,
    target: Option<LivingId>,
) -> CastOutcome {
    let info = spell_info(spell);
    let (mana, level) = match world.living(caster) {
        Some(c) if c.is_alive() => (c.pools.mana, c.level),
        _ => return CastOutcome::NoTarget,
    };
    let target = match resolve_target(world, caster, info.class, target) {
        Some(target) => target,
        None => return CastOutcome::NoTarget,
    };
    if mana < info.mana {
        return CastOutcome::NotEnoughMana { needed: info.mana };
    }
    if let Some(c) = world.living_mut(caster) {
        c.pools.mana -= info.mana;
    }
    debug!("{} casts {} on {}", caster, spell.name(), target);

    act(
        &mut ctx.out,
        world,
        &format!("You utter the words, '{}'.", spell.name()),
        Audience::Actor,
        caster,
        Some(target),
    );
    act(&mut ctx.out, world, "@n utters some strange words.", Audience::RoomExceptActor, caster, Some(target));

    match info.class {
        SpellClass::Attack | SpellClass::Curse => {
            let resisted = match (CombatStats::of(world, caster), CombatStats::of(world, target)) {
                (Some(c), Some(t)) => !can_hit_magic(&c, &t, ctx.rng.as_mut()),
                _ => return CastOutcome::NoTarget,
            };
            if resisted {
                engage(world, caster, target);
                act(&mut ctx.out, world, "@T resists your spell.", Audience::Actor, caster, Some(target));
                act(&mut ctx.out, world, "You resist @n's spell.", Audience::Target, caster, Some(target));
                return CastOutcome::Resisted;
            }
            if info.class == SpellClass::Attack {
                let damage = match spell {
                    SpellKind::Fireball => {
                        let low = level.max(1);
                        ctx.rng.range(low, low * 3)
                    }
                    _ => ctx.rng.range(1, 8) + level / 2,
                };
                act(&mut ctx.out, world, &format!("Your {} strikes @t.", spell.name()), Audience::Actor, caster, Some(target));
                act(&mut ctx.out, world, &format!("@n's {} strikes you.", spell.name()), Audience::Target, caster, Some(target));
                return CastOutcome::Damage(special_attack(world, ctx, caster, target, f64::from(damage)));
            }
            engage(world, caster, target);
            affect(world, ctx, caster, target, spell, level)
        }
        SpellClass::Blessing => affect(world, ctx, caster, target, spell, level),
        SpellClass::Heal => {
            let amount = (ctx.rng.range(1, 8) + level / 4) as i32;
            let healed = world
                .living_mut(target)
                .map(|t| t.pools.heal(amount))
                .unwrap_or(0);
            act(&mut ctx.out, world, "You feel better!", Audience::Target, caster, Some(target));
            if target == caster {
                act(&mut ctx.out, world, "You feel better!", Audience::Actor, caster, None);
            } else {
                act(&mut ctx.out, world, "You heal @t.", Audience::Actor, caster, Some(target));
            }
            CastOutcome::Healed(healed)
        }
    }
}

fn affect(
    world: &mut World,
    ctx: &mut GameContext,
    caster: LivingId,
    target: LivingId,
    spell: SpellKind,
    level: u32,
) -> CastOutcome {
    let affection = match spell_affection(spell, level, ctx.now()) {
        Some(affection) => affection,
        None => return CastOutcome::NoTarget,
    };
    match world.living_mut(target) {
        Some(t) => t.affections.add(affection),
        None => return CastOutcome::NoTarget,
    }
    let text = match spell {
        SpellKind::Armor => "You feel someone protecting you.",
        SpellKind::Bless => "You feel righteous.",
        SpellKind::GiantStrength => "You feel stronger.",
        SpellKind::Blindness => "You have been blinded!",
        SpellKind::Poison => "You feel very sick.",
        _ => "You feel a strange sensation.",
    };
    if target == caster {
        act(&mut ctx.out, world, text, Audience::Actor, caster, None);
    } else {
        act(&mut ctx.out, world, text, Audience::Target, caster, Some(target));
        act(&mut ctx.out, world, "Your spell takes hold of @t.", Audience::Actor, caster, Some(target));
    }
    CastOutcome::Affected
}

/// Poison damage for one living update. Returns `None` if the living is not poisoned.
pub fn apply_poison(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Option<AttackOutcome> {
    let level = world
        .living(id)?
        .affections
        .spell(SpellKind::Poison)?
        .level;
    act(&mut ctx.out, world, "You feel burning poison in your blood, and suffer.", Audience::Actor, id, None);
    act(&mut ctx.out, world, "@n shivers and suffers.", Audience::RoomExceptActor, id, None);
    Some(apply_damage(world, ctx, None, id, poison_damage(level)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn buffs_expire_later_for_stronger_casters() {
        let now = chrono::Utc.timestamp_opt(0, 0).single().unwrap();
        let weak = spell_affection(SpellKind::Armor, 1, now).unwrap();
        let strong = spell_affection(SpellKind::Armor, 20, now).unwrap();
        assert!(strong.expires_at > weak.expires_at);
        assert_eq!(weak.modifiers.get(Modifier::Armor), 20);
    }

    #[test]
    fn damage_spells_leave_no_affection() {
        let now = chrono::Utc.timestamp_opt(0, 0).single().unwrap();
        assert!(spell_affection(SpellKind::MagicMissile, 10, now).is_none());
        assert!(spell_affection(SpellKind::CureLight, 10, now).is_none());
    }

    #[test]
    fn poison_scales_with_level() {
        assert_eq!(poison_damage(1), 1);
        assert_eq!(poison_damage(8), 3);
    }
}
