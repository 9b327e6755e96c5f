// Use-case level inputs/outputs for the game loop.

use crate::domain::{PlayerId, PlayerInput, RankEntry, WorldEvent, WorldSnapshot};

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        display_name: String,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        input: PlayerInput,
    },
    Respawn {
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded { closes_in: u32 },
    /// The world task has stopped; no further updates follow.
    Closed,
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub snapshot: WorldSnapshot,
    /// Everything that happened since the previous update.
    pub events: Vec<WorldEvent>,
    /// Present on ticks where the scoreboard is republished.
    pub rankings: Option<Vec<RankEntry>>,
}
