// Character stat bundles granted by loadouts and power-ups.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStats {
    pub bomb_range: i32,
    pub bomb_amount: i32,
    /// Shield hearts; each one absorbs a lethal hit.
    pub heart: i32,
    pub move_speed: i32,
    pub can_kick_bomb: bool,
}

impl Add for CharacterStats {
    type Output = CharacterStats;

    fn add(self, other: CharacterStats) -> CharacterStats {
        CharacterStats {
            bomb_range: self.bomb_range + other.bomb_range,
            bomb_amount: self.bomb_amount + other.bomb_amount,
            heart: self.heart + other.heart,
            move_speed: self.move_speed + other.move_speed,
            can_kick_bomb: self.can_kick_bomb || other.can_kick_bomb,
        }
    }
}

impl AddAssign for CharacterStats {
    fn add_assign(&mut self, other: CharacterStats) {
        *self = *self + other;
    }
}

impl Sub for CharacterStats {
    type Output = CharacterStats;

    fn sub(self, other: CharacterStats) -> CharacterStats {
        CharacterStats {
            bomb_range: self.bomb_range - other.bomb_range,
            bomb_amount: self.bomb_amount - other.bomb_amount,
            heart: self.heart - other.heart,
            move_speed: self.move_speed - other.move_speed,
            can_kick_bomb: self.can_kick_bomb && other.can_kick_bomb,
        }
    }
}

/// Upper bounds applied when power-up stats are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatCaps {
    pub max_bomb_range: i32,
    pub max_bomb_amount: i32,
    pub max_heart: i32,
    pub max_move_speed: i32,
}

impl Default for StatCaps {
    fn default() -> Self {
        Self {
            max_bomb_range: 9,
            max_bomb_amount: 9,
            max_heart: 9,
            max_move_speed: 9,
        }
    }
}

impl CharacterStats {
    pub fn capped_bomb_range(&self, caps: &StatCaps) -> i32 {
        self.bomb_range.min(caps.max_bomb_range)
    }

    pub fn capped_bomb_amount(&self, caps: &StatCaps) -> i32 {
        self.bomb_amount.min(caps.max_bomb_amount)
    }

    pub fn capped_heart(&self, caps: &StatCaps) -> i32 {
        self.heart.min(caps.max_heart)
    }

    pub fn capped_move_speed(&self, caps: &StatCaps) -> i32 {
        self.move_speed.min(caps.max_move_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(range: i32, kick: bool) -> CharacterStats {
        CharacterStats {
            bomb_range: range,
            can_kick_bomb: kick,
            ..CharacterStats::default()
        }
    }

    #[test]
    fn add_sums_counts_and_ors_kick() {
        let total = stats(1, false) + stats(2, true);
        assert_eq!(total.bomb_range, 3);
        assert!(total.can_kick_bomb);
    }

    #[test]
    fn sub_ands_kick() {
        let diff = stats(3, true) - stats(1, false);
        assert_eq!(diff.bomb_range, 2);
        assert!(!diff.can_kick_bomb);
    }

    #[test]
    fn caps_limit_reported_values() {
        let caps = StatCaps::default();
        let s = CharacterStats {
            bomb_range: 12,
            heart: 2,
            ..CharacterStats::default()
        };
        assert_eq!(s.capped_bomb_range(&caps), 9);
        assert_eq!(s.capped_heart(&caps), 2);
    }
}
