//! # Combat Resolution
//!
//! Combat is resolved one attack at a time against the live world. Each attack re-validates
//! its target (alive, distinct, same room), rolls to hit, rolls damage, subtracts it from the
//! victim's health and, once health reaches zero, runs the death flow exactly once.
//!
//! The maths lives in pure functions over [`CombatStats`] snapshots and a [`RandomSource`],
//! so it can be tested without a world:
//!
//! - [`hit_chance`] / [`can_hit`]: 75% base, bounded to 5..=95, shifted by dexterity,
//!   hitroll, armor and level difference.
//! - [`magic_hit_chance`] / [`can_hit_magic`]: the same for spells, using intelligence and saves.
//! - [`get_attack_damage`]: weapon or natural damage scaled by level, strength and damroll,
//!   reduced by armor, never below the configured minimum.
//!
//! Fight state is implicit: a living is fighting while its `target` is set. Fights end when
//! one side dies, flees, is rescued or the target becomes invalid at the next round.

pub mod experience;
pub mod flee;
pub mod special;
pub mod spells;

use chrono::Duration;
use log::{debug, info, warn};

use crate::engine::act::{act, ActSink, Audience};
use crate::engine::context::GameContext;
use crate::engine::random::RandomSource;
use crate::errors::GameError;
use crate::metrics;
use crate::scripting::{self, HookEvent, ScriptType};
use crate::world::{
    DamageRange, Direction, ItemId, LivingFlag, LivingId, Modifier, SkillKind, World,
};

use experience::{gain_experience, get_exp_gain, MonsterStats};

pub const BASE_TO_HIT: i32 = 75;
pub const MIN_TO_HIT: i32 = 5;
pub const MAX_TO_HIT: i32 = 95;

/// Effective combat numbers for one living, with equipment and affections applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatStats {
    pub level: u32,
    pub str: i32,
    pub dex: i32,
    pub int: i32,
    pub hitroll: i32,
    pub damroll: i32,
    pub armor: i32,
    pub saves: i32,
    pub damage: DamageRange,
    pub is_monster: bool,
}

impl CombatStats {
    pub fn of(world: &World, id: LivingId) -> Option<Self> {
        let living = world.living(id)?;
        let damage = world
            .wielded(id)
            .and_then(|weapon| weapon.weapon_damage())
            .unwrap_or(living.natural_damage);
        Some(Self {
            level: living.level,
            str: living.attributes.str + world.modifier(id, Modifier::Str),
            dex: living.attributes.dex + world.modifier(id, Modifier::Dex),
            int: living.attributes.int + world.modifier(id, Modifier::Int),
            hitroll: world.modifier(id, Modifier::Hitroll),
            damroll: world.modifier(id, Modifier::Damroll),
            armor: world.modifier(id, Modifier::Armor),
            saves: world.modifier(id, Modifier::Saves),
            damage,
            is_monster: living.is_monster(),
        })
    }
}

fn level_gap(a: &CombatStats, b: &CombatStats) -> i32 {
    a.level as i32 - b.level as i32
}

pub fn hit_chance(attacker: &CombatStats, defender: &CombatStats) -> i32 {
    let chance = BASE_TO_HIT + (attacker.dex - defender.dex) * 2 + attacker.hitroll * 2
        - defender.armor / 4
        + level_gap(attacker, defender) * 2;
    chance.clamp(MIN_TO_HIT, MAX_TO_HIT)
}

pub fn can_hit(attacker: &CombatStats, defender: &CombatStats, rng: &mut dyn RandomSource) -> bool {
    rng.percent_roll() as i32 <= hit_chance(attacker, defender)
}

pub fn magic_hit_chance(caster: &CombatStats, target: &CombatStats) -> i32 {
    let chance = BASE_TO_HIT + (caster.int - target.int) * 2 - target.saves * 3
        + level_gap(caster, target) * 2;
    chance.clamp(MIN_TO_HIT, MAX_TO_HIT)
}

pub fn can_hit_magic(caster: &CombatStats, target: &CombatStats, rng: &mut dyn RandomSource) -> bool {
    rng.percent_roll() as i32 <= magic_hit_chance(caster, target)
}

/// Damage for one successful hit. Never below `min_damage`.
pub fn get_attack_damage(
    attacker: &CombatStats,
    defender: &CombatStats,
    rng: &mut dyn RandomSource,
    min_damage: f64,
) -> f64 {
    let range = attacker.damage.normalized();
    let roll = rng.range(range.min, range.max) as f64;
    let scaled = if attacker.is_monster {
        roll * MonsterStats::get_damage_multiplier(attacker.level)
    } else {
        roll + attacker.level as f64 / 4.0
    };
    let bonus = ((attacker.str - 13) / 2) as f64 + attacker.damroll as f64;
    let reduction = (defender.armor.max(0) as f64 / 200.0).min(0.5);
    ((scaled + bonus) * (1.0 - reduction)).max(min_damage.max(0.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathReport {
    pub victim: LivingId,
    pub name: String,
    pub killer: Option<LivingId>,
    pub corpse: Option<ItemId>,
    /// Experience handed out, per player.
    pub awards: Vec<(LivingId, u64)>,
    pub was_player: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttackOutcome {
    /// Precondition failed; nothing changed.
    Invalid,
    Missed,
    Hit { damage: i32 },
    Killed { damage: i32, death: DeathReport },
}

impl AttackOutcome {
    pub fn is_kill(&self) -> bool {
        matches!(self, AttackOutcome::Killed { .. })
    }
}

/// Start (or continue) a fight: the attacker targets the victim, and the victim fights back
/// if it is not already busy with someone else.
pub fn engage(world: &mut World, attacker: LivingId, target: LivingId) {
    if let Some(a) = world.living_mut(attacker) {
        a.target = Some(target);
    }
    if let Some(t) = world.living_mut(target) {
        if t.target.is_none() {
            t.target = Some(attacker);
        }
    }
}

fn damage_verb(damage: i32) -> (&'static str, &'static str) {
    match damage {
        d if d <= 0 => ("miss", "misses"),
        1..=2 => ("scratch", "scratches"),
        3..=5 => ("hit", "hits"),
        6..=10 => ("wound", "wounds"),
        11..=20 => ("maul", "mauls"),
        21..=40 => ("massacre", "massacres"),
        _ => ("annihilate", "annihilates"),
    }
}

fn hit_messages(world: &World, ctx: &mut GameContext, attacker: LivingId, target: LivingId, damage: i32) {
    let (first, third) = damage_verb(damage);
    act(&mut ctx.out, world, &format!("You {} @t.", first), Audience::Actor, attacker, Some(target));
    act(&mut ctx.out, world, &format!("@n {} you.", third), Audience::Target, attacker, Some(target));
    act(&mut ctx.out, world, &format!("@n {} @t.", third), Audience::RoomExceptBoth, attacker, Some(target));
}

fn miss_messages(world: &World, ctx: &mut GameContext, attacker: LivingId, target: LivingId) {
    act(&mut ctx.out, world, "You miss @t.", Audience::Actor, attacker, Some(target));
    act(&mut ctx.out, world, "@n misses you.", Audience::Target, attacker, Some(target));
    act(&mut ctx.out, world, "@n misses @t.", Audience::RoomExceptBoth, attacker, Some(target));
}

fn dodged(world: &World, ctx: &mut GameContext, attacker: LivingId, target: LivingId) -> bool {
    let skill = world.living(target).map(|t| t.skill(SkillKind::Dodge)).unwrap_or(0);
    if skill == 0 || ctx.rng.percent_roll() > u32::from(skill) / 4 {
        return false;
    }
    act(&mut ctx.out, world, "You dodge @n's attack.", Audience::Target, attacker, Some(target));
    act(&mut ctx.out, world, "@T dodges your attack.", Audience::Actor, attacker, Some(target));
    true
}

/// One regular attack: roll to hit, roll damage, apply it.
pub fn attack(world: &mut World, ctx: &mut GameContext, attacker: LivingId, target: LivingId) -> AttackOutcome {
    if !world.valid_target(attacker, target) {
        warn!("attack by {} on {} ignored: invalid target", attacker, target);
        return AttackOutcome::Invalid;
    }
    engage(world, attacker, target);
    metrics::record_attack();

    let (a, d) = match (CombatStats::of(world, attacker), CombatStats::of(world, target)) {
        (Some(a), Some(d)) => (a, d),
        _ => return AttackOutcome::Invalid,
    };
    if !can_hit(&a, &d, ctx.rng.as_mut()) {
        miss_messages(world, ctx, attacker, target);
        return AttackOutcome::Missed;
    }
    if dodged(world, ctx, attacker, target) {
        return AttackOutcome::Missed;
    }
    let damage = get_attack_damage(&a, &d, ctx.rng.as_mut(), ctx.settings.min_damage).round() as i32;
    hit_messages(world, ctx, attacker, target, damage);
    apply_damage(world, ctx, Some(attacker), target, damage)
}

/// Apply precomputed damage through the same path as a regular hit, without rolling.
pub fn special_attack(
    world: &mut World,
    ctx: &mut GameContext,
    attacker: LivingId,
    target: LivingId,
    damage: f64,
) -> AttackOutcome {
    if !world.valid_target(attacker, target) {
        warn!("special attack by {} on {} ignored: invalid target", attacker, target);
        return AttackOutcome::Invalid;
    }
    engage(world, attacker, target);
    metrics::record_attack();
    apply_damage(world, ctx, Some(attacker), target, damage.round().max(0.0) as i32)
}

/// Subtract damage from the victim and run the death flow when it drops to zero.
/// `attacker` is `None` for damage over time.
pub fn apply_damage(
    world: &mut World,
    ctx: &mut GameContext,
    attacker: Option<LivingId>,
    victim: LivingId,
    damage: i32,
) -> AttackOutcome {
    let dealt = match world.living_mut(victim) {
        Some(v) if v.is_alive() => {
            let dealt = v.pools.take_damage(damage);
            if let Some(a) = attacker {
                v.record_damage(a, dealt);
            }
            if v.pools.health > 0 {
                return AttackOutcome::Hit { damage: dealt };
            }
            dealt
        }
        _ => return AttackOutcome::Invalid,
    };
    match death(world, ctx, victim, attacker) {
        Some(report) => AttackOutcome::Killed {
            damage: dealt,
            death: report,
        },
        None => AttackOutcome::Hit { damage: dealt },
    }
}

/// Death flow. Returns `None` if the living is unknown or its death already ran.
pub fn death(
    world: &mut World,
    ctx: &mut GameContext,
    victim: LivingId,
    killer: Option<LivingId>,
) -> Option<DeathReport> {
    let (room, name, was_player) = {
        let v = world.living_mut(victim)?;
        if v.dead {
            return None;
        }
        v.dead = true;
        v.pools.health = 0;
        (v.room, v.name.clone(), v.is_player())
    };
    metrics::record_kill();
    info!("{} ({}) died, killer {:?}", name, victim, killer);

    let hook = HookEvent::new(ScriptType::Death, victim, room).with_target(killer);
    if !scripting::dispatch(world, ctx, hook).is_handled() {
        act(&mut ctx.out, world, "@n is DEAD!! R.I.P.", Audience::RoomExceptActor, victim, None);
    }
    act(&mut ctx.out, world, "You are DEAD!!", Audience::Actor, victim, None);

    let awards = award_experience(world, ctx, victim);
    world.stop_fighting(victim);
    if let Some(v) = world.living_mut(victim) {
        v.affections.clear();
        v.damage_taken.clear();
    }

    let decay_at = ctx.now() + Duration::seconds(ctx.settings.corpse_decay_seconds.max(0));
    let corpse = match world.make_corpse(victim, decay_at) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("failed to leave a corpse for {}: {}", victim, e);
            None
        }
    };

    if was_player {
        if let Err(e) = recover_player(world, ctx, victim) {
            warn!("failed to recover {} after death: {}", victim, e);
        }
    } else {
        world.remove_living(victim);
    }

    Some(DeathReport {
        victim,
        name,
        killer,
        corpse,
        awards,
        was_player,
    })
}

fn recover_player(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Result<(), GameError> {
    let start = world.start_room;
    world.move_living(id, start)?;
    if let Some(player) = world.living_mut(id) {
        player.pools.health = 1;
        player.dead = false;
    }
    act(
        &mut ctx.out,
        world,
        "You awaken in a familiar place, weak but alive.",
        Audience::Actor,
        id,
        None,
    );
    act(&mut ctx.out, world, "@n appears in a shimmer of light.", Audience::RoomExceptActor, id, None);
    Ok(())
}

/// Hand every player who damaged the victim their share of its experience value.
fn award_experience(world: &mut World, ctx: &mut GameContext, victim: LivingId) -> Vec<(LivingId, u64)> {
    let (monster_level, worth, max_health, shares) = match world.living(victim) {
        Some(v) => {
            let worth = v
                .template()
                .map(|t| MonsterStats::exp_value(t.exp, v.level))
                .unwrap_or(0);
            let shares: Vec<(LivingId, i32)> =
                v.damage_taken.iter().map(|(id, dmg)| (*id, *dmg)).collect();
            (v.level, worth, v.pools.max_health, shares)
        }
        None => return Vec::new(),
    };
    if worth == 0 {
        return Vec::new();
    }

    let mut awards = Vec::new();
    for (player, damage) in shares {
        let level_up = match world.living_mut(player) {
            Some(p) if p.is_player() && !p.dead => {
                let gain = get_exp_gain(p.level, monster_level, worth, max_health, damage);
                if gain == 0 {
                    continue;
                }
                awards.push((player, gain));
                let level_up = gain_experience(p, gain);
                act_text(ctx, player, format!("You receive {} experience points.", gain));
                level_up
            }
            _ => continue,
        };
        if let Some(up) = level_up {
            debug!("{} reached level {}", player, up.to);
            act_text(ctx, player, format!("You raise a level! You are now level {}.", up.to));
        }
    }
    awards
}

fn act_text(ctx: &mut GameContext, to: LivingId, text: String) {
    ctx.out.send(to, text);
}

/// Number of regular attacks this living gets in one combat round.
pub fn attacks_per_round(world: &World, ctx: &mut GameContext, id: LivingId) -> u32 {
    let living = match world.living(id) {
        Some(living) => living,
        None => return 0,
    };
    if living.is_monster() {
        return u32::from(living.attacks.max(1));
    }
    let mut attacks = 1;
    for skill in [SkillKind::SecondAttack, SkillKind::ThirdAttack] {
        let level = living.skill(skill);
        if level == 0 || ctx.rng.percent_roll() > u32::from(level) {
            break;
        }
        attacks += 1;
    }
    attacks
}

/// One combat round for a living: validate its target, give fight scripts a chance, then
/// attack as many times as it may.
pub fn fight_round(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Result<(), GameError> {
    let (target, room) = match world.living(id) {
        Some(l) if l.is_alive() => match l.target {
            Some(target) => (target, l.room),
            None => return Ok(()),
        },
        _ => return Ok(()),
    };
    if !world.valid_target(id, target) {
        debug!("{} stops fighting {}: target gone", id, target);
        if let Some(l) = world.living_mut(id) {
            l.target = None;
        }
        return Ok(());
    }

    let hook = HookEvent::new(ScriptType::Fight, id, room).with_target(Some(target));
    if scripting::dispatch(world, ctx, hook).is_handled() {
        return Ok(());
    }

    for _ in 0..attacks_per_round(world, ctx, id) {
        match attack(world, ctx, id, target) {
            AttackOutcome::Killed { .. } | AttackOutcome::Invalid => break,
            _ => {}
        }
    }
    check_wimpy(world, ctx, target);
    Ok(())
}

/// Flee automatically when health drops under the living's threshold.
pub fn check_wimpy(world: &mut World, ctx: &mut GameContext, id: LivingId) -> Option<Direction> {
    let should_flee = match world.living(id) {
        Some(l) if l.is_alive() && l.is_fighting() => {
            if l.is_monster() {
                l.has_flag(LivingFlag::Wimpy) && l.pools.health_percent() < ctx.settings.wimpy_percent
            } else {
                l.wimpy > 0 && l.pools.health <= l.wimpy
            }
        }
        _ => false,
    };
    if should_flee {
        flee::flee(world, ctx, id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::random::ScriptedRandom;

    fn stats(level: u32) -> CombatStats {
        CombatStats {
            level,
            str: 13,
            dex: 13,
            int: 13,
            hitroll: 0,
            damroll: 0,
            armor: 0,
            saves: 0,
            damage: DamageRange::new(1, 4),
            is_monster: false,
        }
    }

    #[test]
    fn hit_chance_is_bounded() {
        let mut strong = stats(50);
        strong.dex = 25;
        strong.hitroll = 20;
        let weak = stats(1);
        assert_eq!(hit_chance(&strong, &weak), MAX_TO_HIT);
        assert_eq!(hit_chance(&weak, &strong), MIN_TO_HIT);
        assert_eq!(hit_chance(&stats(5), &stats(5)), BASE_TO_HIT);
    }

    #[test]
    fn armor_makes_defender_harder_to_hit() {
        let mut armored = stats(5);
        armored.armor = 40;
        assert_eq!(hit_chance(&stats(5), &armored), BASE_TO_HIT - 10);
    }

    #[test]
    fn roll_must_not_exceed_chance() {
        let a = stats(5);
        let mut rng = ScriptedRandom::new().with_rolls([75, 76]);
        assert!(can_hit(&a, &a, &mut rng));
        assert!(!can_hit(&a, &a, &mut rng));
    }

    #[test]
    fn saves_resist_magic() {
        let mut warded = stats(5);
        warded.saves = 5;
        assert_eq!(magic_hit_chance(&stats(5), &warded), BASE_TO_HIT - 15);
    }

    #[test]
    fn damage_has_a_floor() {
        let mut weak = stats(1);
        weak.str = 3;
        let mut armored = stats(1);
        armored.armor = 500;
        let mut rng = ScriptedRandom::new();
        let damage = get_attack_damage(&weak, &armored, &mut rng, 1.0);
        assert_eq!(damage, 1.0);
    }

    #[test]
    fn monster_damage_scales_with_level() {
        let mut monster = stats(25);
        monster.is_monster = true;
        monster.damage = DamageRange::new(4, 4);
        let mut rng = ScriptedRandom::new();
        assert_eq!(get_attack_damage(&monster, &stats(1), &mut rng, 1.0), 12.0);
    }
}
