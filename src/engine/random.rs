use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Injectable source of randomness for combat rolls, AI and flee direction.
pub trait RandomSource {
    /// Uniform roll in `1..=100`.
    fn percent_roll(&mut self) -> u32;

    /// Uniform value in `low..=high`. Returns `low` when the range is empty.
    fn range(&mut self, low: u32, high: u32) -> u32;
}

pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for StdRandom {
    fn percent_roll(&mut self) -> u32 {
        self.rng.gen_range(1..=100)
    }

    fn range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Replays queued values. Percent rolls and ranges draw from separate queues; when a queue is
/// empty the fallback is used (50 for percent rolls, `low` for ranges).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    rolls: VecDeque<u32>,
    ranges: VecDeque<u32>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rolls<I: IntoIterator<Item = u32>>(mut self, rolls: I) -> Self {
        self.rolls.extend(rolls);
        self
    }

    pub fn with_ranges<I: IntoIterator<Item = u32>>(mut self, ranges: I) -> Self {
        self.ranges.extend(ranges);
        self
    }

    pub fn push_roll(&mut self, roll: u32) {
        self.rolls.push_back(roll);
    }

    pub fn push_range(&mut self, value: u32) {
        self.ranges.push_back(value);
    }
}

impl RandomSource for ScriptedRandom {
    fn percent_roll(&mut self) -> u32 {
        self.rolls.pop_front().unwrap_or(50).clamp(1, 100)
    }

    fn range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.ranges
            .pop_front()
            .map(|value| value.clamp(low, high))
            .unwrap_or(low)
    }
}
