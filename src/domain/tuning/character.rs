use crate::domain::stats::{CharacterStats, StatCaps};
use serde::Deserialize;

/// Gameplay tuning for characters.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CharacterTuning {
    /// Move speed every character has before power-ups.
    pub min_move_speed: i32,

    /// Move speed added per collected speed power-up.
    pub add_move_speed_per_power_up: i32,

    /// Converts move speed points into cells per second.
    pub move_speed_rate: f32,

    /// Caps for power-up stats.
    pub caps: StatCaps,

    /// Stats granted on spawn and restored on a progress reset.
    pub base_stats: CharacterStats,

    /// Seconds a dead character waits before it may respawn.
    pub respawn_seconds: f32,

    /// Seconds of invincibility after spawning or losing a heart.
    pub invincible_seconds: f32,
}

impl Default for CharacterTuning {
    fn default() -> Self {
        Self {
            min_move_speed: 30,
            add_move_speed_per_power_up: 5,
            move_speed_rate: 0.1,
            caps: StatCaps::default(),
            base_stats: CharacterStats::default(),
            respawn_seconds: 5.0,
            invincible_seconds: 1.5,
        }
    }
}
