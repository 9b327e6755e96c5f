use serde::Deserialize;

/// Gameplay tuning for bombs.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BombTuning {
    /// Fuse length in seconds.
    pub life_time: f32,

    /// Slide speed of a kicked bomb in cells per second.
    pub kick_move_speed: f32,

    /// When set, blasts keep going after destroying a brick.
    pub explode_through_bricks: bool,
}

impl Default for BombTuning {
    fn default() -> Self {
        Self {
            life_time: 2.0,
            kick_move_speed: 5.0,
            explode_through_bricks: false,
        }
    }
}

/// Gameplay tuning for destructible bricks.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BrickTuning {
    /// Seconds a destroyed brick stays down.
    pub respawn_seconds: f32,

    /// Bricks only come back when no character or bomb is this close (in cells).
    pub respawn_clear_radius: f32,
}

impl Default for BrickTuning {
    fn default() -> Self {
        Self {
            respawn_seconds: 30.0,
            respawn_clear_radius: 5.0,
        }
    }
}
