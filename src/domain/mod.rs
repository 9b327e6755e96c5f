// Domain layer: arena simulation types and rules, free of networking.

pub mod blast;
pub mod events;
pub mod grid;
pub mod power_ups;
pub mod rules;
pub mod state;
pub mod stats;
pub mod systems;
pub mod tuning;
pub mod world;

pub use blast::{Blast, BlastTile};
pub use events::WorldEvent;
pub use grid::{ArenaLayout, Cell, Direction, LayoutError};
pub use power_ups::PowerUpKind;
pub use rules::{GameMode, MatchRules, RankEntry};
pub use state::{PlayerId, PlayerInput, WorldSnapshot};
pub use stats::CharacterStats;
pub use tuning::GameplayTuning;
pub use world::{DamageOutcome, PlantError, RespawnError, World};
