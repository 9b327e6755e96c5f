// Power-up kinds and the weighted drop roll used when bricks break.

use crate::domain::stats::CharacterStats;
use crate::domain::tuning::PowerUpTuning;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    BombRange,
    BombAmount,
    Heart,
    MoveSpeed,
    Kick,
}

impl PowerUpKind {
    /// Stats added to the character that collects this power-up.
    pub fn stats(self) -> CharacterStats {
        let mut stats = CharacterStats::default();
        match self {
            PowerUpKind::BombRange => stats.bomb_range = 1,
            PowerUpKind::BombAmount => stats.bomb_amount = 1,
            PowerUpKind::Heart => stats.heart = 1,
            PowerUpKind::MoveSpeed => stats.move_speed = 1,
            PowerUpKind::Kick => stats.can_kick_bomb = true,
        }
        stats
    }
}

/// Rolls the drop table; `None` means the brick dropped nothing.
pub fn roll_drop<R: Rng>(table: &PowerUpTuning, rng: &mut R) -> Option<PowerUpKind> {
    let total: u32 = table.drops.iter().map(|d| d.weight).sum::<u32>() + table.no_drop_weight;
    if total == 0 {
        return None;
    }

    let mut pick = rng.gen_range(0..total);
    for drop in &table.drops {
        if pick < drop.weight {
            return Some(drop.kind);
        }
        pick -= drop.weight;
    }
    None
}
