//! Combat skills: backstab, disarm and rescue.

use log::debug;

use super::{engage, get_attack_damage, special_attack, AttackOutcome, CombatStats};
use crate::engine::act::{act, Audience};
use crate::engine::context::GameContext;
use crate::world::{ItemLocation, Living, LivingId, SkillKind, Slot, World};

#[derive(Debug, Clone, PartialEq)]
pub enum SkillOutcome {
    NotLearned,
    /// Target missing, dead, elsewhere or the user itself.
    InvalidTarget,
    NeedsWeapon,
    /// The user is already in a fight.
    AlreadyFighting,
    /// The target is fighting and cannot be surprised.
    TargetAlert,
    /// Nothing to disarm, or nobody to rescue from.
    NothingToDo,
    Failed,
    Succeeded,
    Struck(AttackOutcome),
}

/// Damage multiplier for backstab: x2 untrained, x5 at full skill.
pub fn get_backstab_multiplier(attacker: &Living) -> f64 {
    let skill = f64::from(attacker.skill(SkillKind::Backstab).min(100));
    2.0 + 3.0 * skill / 100.0
}

fn skill_of(world: &World, id: LivingId, skill: SkillKind) -> u8 {
    world.living(id).map(|l| l.skill(skill)).unwrap_or(0)
}

pub fn backstab(world: &mut World, ctx: &mut GameContext, attacker: LivingId, target: LivingId) -> SkillOutcome {
    let skill = skill_of(world, attacker, SkillKind::Backstab);
    if skill == 0 {
        return SkillOutcome::NotLearned;
    }
    if !world.valid_target(attacker, target) {
        return SkillOutcome::InvalidTarget;
    }
    if world.wielded(attacker).and_then(|w| w.weapon_damage()).is_none() {
        return SkillOutcome::NeedsWeapon;
    }
    if world.living(attacker).is_some_and(|a| a.is_fighting()) {
        return SkillOutcome::AlreadyFighting;
    }
    if world.living(target).is_some_and(|t| t.is_fighting()) {
        return SkillOutcome::TargetAlert;
    }

    if ctx.rng.percent_roll() > u32::from(skill) {
        engage(world, attacker, target);
        act(&mut ctx.out, world, "@T notices you just in time.", Audience::Actor, attacker, Some(target));
        act(&mut ctx.out, world, "You spin around as @n lunges at your back!", Audience::Target, attacker, Some(target));
        act(&mut ctx.out, world, "@n fails to backstab @t.", Audience::RoomExceptBoth, attacker, Some(target));
        return SkillOutcome::Failed;
    }

    let (a, d) = match (CombatStats::of(world, attacker), CombatStats::of(world, target)) {
        (Some(a), Some(d)) => (a, d),
        _ => return SkillOutcome::InvalidTarget,
    };
    let multiplier = world.living(attacker).map(get_backstab_multiplier).unwrap_or(2.0);
    let damage = get_attack_damage(&a, &d, ctx.rng.as_mut(), ctx.settings.min_damage) * multiplier;
    debug!("{} backstabs {} for {:.1}", attacker, target, damage);

    act(&mut ctx.out, world, "You plunge your weapon into @t's back!", Audience::Actor, attacker, Some(target));
    act(&mut ctx.out, world, "@n plunges a weapon into your back!", Audience::Target, attacker, Some(target));
    act(&mut ctx.out, world, "@n places a weapon in @t's back.", Audience::RoomExceptBoth, attacker, Some(target));
    SkillOutcome::Struck(special_attack(world, ctx, attacker, target, damage))
}

/// Knock the wielded weapon of the user's current opponent to the floor.
pub fn disarm(world: &mut World, ctx: &mut GameContext, attacker: LivingId) -> SkillOutcome {
    let skill = skill_of(world, attacker, SkillKind::Disarm);
    if skill == 0 {
        return SkillOutcome::NotLearned;
    }
    let target = match world.living(attacker).and_then(|a| a.target) {
        Some(target) if world.valid_target(attacker, target) => target,
        _ => return SkillOutcome::InvalidTarget,
    };
    let weapon = match world.living(target).and_then(|t| t.equipment.get(&Slot::Wield).copied()) {
        Some(weapon) => weapon,
        None => return SkillOutcome::NothingToDo,
    };

    let dex_edge = match (CombatStats::of(world, attacker), CombatStats::of(world, target)) {
        (Some(a), Some(d)) => a.dex - d.dex,
        _ => 0,
    };
    let chance = (i32::from(skill) / 2 + dex_edge).max(1);
    if ctx.rng.percent_roll() as i32 > chance {
        act(&mut ctx.out, world, "You fail to disarm @t.", Audience::Actor, attacker, Some(target));
        act(&mut ctx.out, world, "@n tries to disarm you, but fails.", Audience::Target, attacker, Some(target));
        return SkillOutcome::Failed;
    }

    let room = match world.living(target) {
        Some(t) => t.room,
        None => return SkillOutcome::InvalidTarget,
    };
    if world.move_item(weapon, ItemLocation::Room(room)).is_err() {
        return SkillOutcome::Failed;
    }
    act(&mut ctx.out, world, "You disarm @t, sending the weapon flying!", Audience::Actor, attacker, Some(target));
    act(&mut ctx.out, world, "@n disarms you! Your weapon clatters to the floor.", Audience::Target, attacker, Some(target));
    act(&mut ctx.out, world, "@n disarms @t.", Audience::RoomExceptBoth, attacker, Some(target));
    SkillOutcome::Succeeded
}

/// Take the victim's attackers upon yourself.
pub fn rescue(world: &mut World, ctx: &mut GameContext, rescuer: LivingId, victim: LivingId) -> SkillOutcome {
    let skill = skill_of(world, rescuer, SkillKind::Rescue);
    if skill == 0 {
        return SkillOutcome::NotLearned;
    }
    if !world.valid_target(rescuer, victim) {
        return SkillOutcome::InvalidTarget;
    }
    let attackers: Vec<LivingId> = world
        .attackers_of(victim)
        .into_iter()
        .filter(|id| *id != rescuer && world.valid_target(*id, victim))
        .collect();
    if attackers.is_empty() {
        return SkillOutcome::NothingToDo;
    }
    if ctx.rng.percent_roll() > u32::from(skill) {
        act(&mut ctx.out, world, "You fail the rescue.", Audience::Actor, rescuer, Some(victim));
        return SkillOutcome::Failed;
    }

    for attacker in &attackers {
        if let Some(a) = world.living_mut(*attacker) {
            a.target = Some(rescuer);
        }
    }
    if let Some(v) = world.living_mut(victim) {
        v.target = None;
    }
    if let Some(r) = world.living_mut(rescuer) {
        r.target = Some(attackers[0]);
    }
    act(&mut ctx.out, world, "Banzai! You rescue @t!", Audience::Actor, rescuer, Some(victim));
    act(&mut ctx.out, world, "You are rescued by @n. You are confused!", Audience::Target, rescuer, Some(victim));
    act(&mut ctx.out, world, "@n heroically rescues @t.", Audience::RoomExceptBoth, rescuer, Some(victim));
    SkillOutcome::Succeeded
}
