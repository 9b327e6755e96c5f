// Gameplay tuning, loadable from a TOML file; every field has a default.

pub mod bomb;
pub mod character;

use crate::domain::power_ups::PowerUpKind;
use serde::Deserialize;

pub use bomb::{BombTuning, BrickTuning};
pub use character::CharacterTuning;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GameplayTuning {
    pub character: CharacterTuning,
    pub bomb: BombTuning,
    pub brick: BrickTuning,
    pub power_ups: PowerUpTuning,
    pub score: ScoreTuning,
    pub bots: BotTuning,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DropWeight {
    pub kind: PowerUpKind,
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    pub drops: Vec<DropWeight>,
    /// Weight of the "nothing drops" outcome.
    pub no_drop_weight: u32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        let drop = |kind, weight| DropWeight { kind, weight };
        Self {
            drops: vec![
                drop(PowerUpKind::BombRange, 3),
                drop(PowerUpKind::BombAmount, 3),
                drop(PowerUpKind::MoveSpeed, 2),
                drop(PowerUpKind::Heart, 1),
                drop(PowerUpKind::Kick, 1),
            ],
            no_drop_weight: 1,
        }
    }
}

/// Score values for the open-ended mode; deathmatch uses its own fixed values.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScoreTuning {
    pub kill_score: i32,
    pub suicide_score: i32,
    /// How often rankings are published, in seconds.
    pub update_score_seconds: f32,
}

impl Default for ScoreTuning {
    fn default() -> Self {
        Self {
            kill_score: 15,
            suicide_score: -20,
            update_score_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotTuning {
    pub names: Vec<String>,
    /// Longest random route a bot plans at once.
    pub max_route_steps: usize,
    /// Routes shorter than this never stop early to plant.
    pub min_route_steps: usize,
}

impl Default for BotTuning {
    fn default() -> Self {
        Self {
            names: ["Blinky", "Sparky", "Fuse", "Boomer", "Dynamo", "Cinder"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_route_steps: 10,
            min_route_steps: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let tuning: GameplayTuning = toml::from_str(
            r#"
            [bomb]
            life_time = 3.5

            [score]
            kill_score = 20

            [power_ups]
            no_drop_weight = 4
            drops = [{ kind = "kick", weight = 2 }]
            "#,
        )
        .expect("tuning should parse");

        assert_eq!(tuning.bomb.life_time, 3.5);
        assert_eq!(tuning.bomb.kick_move_speed, 5.0);
        assert_eq!(tuning.score.kill_score, 20);
        assert_eq!(tuning.score.suicide_score, -20);
        assert_eq!(tuning.character.min_move_speed, 30);
        assert_eq!(tuning.power_ups.no_drop_weight, 4);
        assert_eq!(tuning.power_ups.drops.len(), 1);
        assert_eq!(tuning.power_ups.drops[0].kind, PowerUpKind::Kick);
    }
}
