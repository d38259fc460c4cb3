//! Experience awards and level scaling.

use crate::world::Living;

pub const MAX_LEVEL: u32 = 50;

/// Share of experience a player keeps when fighting something below their level.
/// Full value at or above the player's level, 10% less per level below, nothing at ten below.
pub fn get_penalty_multiplier(player_level: u32, monster_level: u32) -> f64 {
    if monster_level >= player_level {
        return 1.0;
    }
    let gap = (player_level - monster_level) as i64;
    (10 - gap).max(0) as f64 / 10.0
}

/// Experience for dealing `damage` to a monster worth `monster_exp` in total.
pub fn get_exp_gain(
    player_level: u32,
    monster_level: u32,
    monster_exp: u64,
    monster_max_health: i32,
    damage: i32,
) -> u64 {
    if monster_max_health <= 0 || damage <= 0 {
        return 0;
    }
    let share = monster_exp as f64 * damage as f64 / monster_max_health as f64;
    let gain = share * get_penalty_multiplier(player_level, monster_level);
    gain.round().max(0.0) as u64
}

/// Per-level scaling applied to monster templates.
pub struct MonsterStats;

impl MonsterStats {
    /// One extra multiple of template damage every twelve levels.
    pub fn get_damage_multiplier(level: u32) -> f64 {
        1.0 + ((level.max(1) - 1) / 12) as f64
    }

    /// Linear from 1.0 at level 1 to 2.0 at level 50.
    pub fn get_exp_multiplier(level: u32) -> f64 {
        1.0 + (level.max(1) - 1) as f64 / 49.0
    }

    /// Total experience a monster of `base_exp` is worth at `level`.
    pub fn exp_value(base_exp: u32, level: u32) -> u64 {
        (base_exp as f64 * Self::get_exp_multiplier(level)).round() as u64
    }
}

/// Total experience needed to reach `level`.
pub fn exp_for_level(level: u32) -> u64 {
    let steps = u64::from(level.max(1) - 1);
    1000 * steps * steps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

/// Add experience and apply any level gains.
pub fn gain_experience(living: &mut Living, amount: u64) -> Option<LevelUp> {
    living.exp = living.exp.saturating_add(amount);
    let from = living.level;
    while living.level < MAX_LEVEL && living.exp >= exp_for_level(living.level + 1) {
        living.level += 1;
        let con_bonus = ((living.attributes.con - 13) / 2).clamp(-2, 4);
        living.pools.max_health += (8 + con_bonus).max(1);
        living.pools.max_mana += 5;
        living.pools.max_moves += 5;
    }
    (living.level > from).then_some(LevelUp {
        from,
        to: living.level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{LivingId, RoomId};

    #[test]
    fn penalty_steps_down_by_tenths() {
        assert_eq!(get_penalty_multiplier(10, 10), 1.0);
        assert_eq!(get_penalty_multiplier(10, 30), 1.0);
        assert_eq!(get_penalty_multiplier(50, 40), 0.0);
        assert!((get_penalty_multiplier(50, 41) - 0.1).abs() < 1e-9);
        assert!((get_penalty_multiplier(10, 9) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn zero_health_monster_yields_nothing() {
        assert_eq!(get_exp_gain(1, 1, 100, 0, 10), 0);
        assert_eq!(get_exp_gain(1, 1, 100, 10, 0), 0);
    }

    #[test]
    fn levels_follow_thresholds() {
        let mut living = Living::new_player(LivingId(1), "Pip", RoomId(1));
        assert_eq!(gain_experience(&mut living, 999), None);
        assert_eq!(
            gain_experience(&mut living, 3001),
            Some(LevelUp { from: 1, to: 3 })
        );
        assert_eq!(living.pools.max_health, 20 + 2 * 8);
    }
}
