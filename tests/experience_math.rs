use mudengine::combat::experience::{
    exp_for_level, gain_experience, get_exp_gain, get_penalty_multiplier, MonsterStats, MAX_LEVEL,
};
use mudengine::world::{Living, LivingId, RoomId};

#[test]
fn penalty_reaches_zero_ten_levels_below() {
    assert_eq!(get_penalty_multiplier(50, 40), 0.0);
    assert!((get_penalty_multiplier(50, 41) - 0.1).abs() < 1e-9);
    assert_eq!(get_penalty_multiplier(5, 5), 1.0);
    assert_eq!(get_penalty_multiplier(5, 45), 1.0);
}

#[test]
fn exp_gain_is_a_damage_share_after_penalty() {
    // 400 * 25/100 = 100, two levels below keeps 80%
    assert_eq!(get_exp_gain(5, 3, 400, 100, 25), 80);
    assert_eq!(get_exp_gain(5, 5, 400, 100, 100), 400);
    assert_eq!(get_exp_gain(50, 40, 400, 100, 100), 0);
    assert_eq!(get_exp_gain(5, 5, 400, 0, 10), 0);
    assert_eq!(get_exp_gain(5, 5, 400, 100, 0), 0);
}

#[test]
fn exp_gain_follows_the_level_gap() {
    assert_eq!(get_exp_gain(30, 25, 400, 100, 25), 50);
    assert_eq!(get_exp_gain(50, 41, 400, 100, 25), 10);
}

#[test]
fn monster_multipliers_scale_with_level() {
    assert_eq!(MonsterStats::get_damage_multiplier(1), 1.0);
    assert_eq!(MonsterStats::get_damage_multiplier(13), 2.0);
    assert_eq!(MonsterStats::get_exp_multiplier(1), 1.0);
    assert_eq!(MonsterStats::get_exp_multiplier(50), 2.0);
    assert_eq!(MonsterStats::exp_value(100, 50), 200);
}

#[test]
fn damage_multiplier_steps_every_twelve_levels() {
    for (level, expected) in [(1, 1.0), (13, 2.0), (25, 3.0), (37, 4.0), (49, 5.0)] {
        assert_eq!(MonsterStats::get_damage_multiplier(level), expected, "level {}", level);
    }
}

#[test]
fn exp_multiplier_checkpoints() {
    let rounded = |level: u32| (MonsterStats::get_exp_multiplier(level) * 1000.0).round() / 1000.0;
    assert_eq!(rounded(1), 1.0);
    assert_eq!(rounded(20), 1.388);
    assert_eq!(rounded(30), 1.592);
    assert_eq!(rounded(40), 1.796);
    assert_eq!(rounded(50), 2.0);
}

#[test]
fn gaining_experience_crosses_several_levels() {
    let mut living = Living::new_player(LivingId(1), "Ines", RoomId(0));
    let before = living.pools.max_health;
    let up = gain_experience(&mut living, exp_for_level(3)).expect("levels gained");
    assert_eq!((up.from, up.to), (1, 3));
    assert_eq!(living.level, 3);
    assert!(living.pools.max_health > before);
    assert!(gain_experience(&mut living, 1).is_none());
}

#[test]
fn level_is_capped() {
    let mut living = Living::new_player(LivingId(1), "Ines", RoomId(0));
    gain_experience(&mut living, u64::MAX);
    assert_eq!(living.level, MAX_LEVEL);
}
