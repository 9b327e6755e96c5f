// Match rules: game modes, scoring, end conditions and rankings.

use crate::domain::tuning::ScoreTuning;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Open-ended arena; dying resets your progress.
    #[default]
    Io,
    /// Timed or kill-limited match; progress survives death.
    DeathMatch,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<GameMode> {
        match value.trim().to_ascii_lowercase().as_str() {
            "io" => Some(GameMode::Io),
            "deathmatch" | "death_match" => Some(GameMode::DeathMatch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Io => "io",
            GameMode::DeathMatch => "deathmatch",
        }
    }

    pub fn kill_score(self, score: &ScoreTuning) -> i32 {
        match self {
            GameMode::Io => score.kill_score,
            GameMode::DeathMatch => 1,
        }
    }

    pub fn suicide_score(self, score: &ScoreTuning) -> i32 {
        match self {
            GameMode::Io => score.suicide_score,
            GameMode::DeathMatch => 0,
        }
    }

    /// Whether respawning wipes score, kills and collected power-ups.
    pub fn resets_progress_on_respawn(self) -> bool {
        matches!(self, GameMode::Io)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    pub mode: GameMode,
    /// Zero disables the time limit.
    pub time_limit: Duration,
    /// Zero disables the kill limit.
    pub kill_limit: u32,
    /// Delay between the match ending and the lobby closing.
    pub end_countdown: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            mode: GameMode::Io,
            time_limit: Duration::ZERO,
            kill_limit: 0,
            end_countdown: Duration::from_secs(10),
        }
    }
}

impl MatchRules {
    /// Only deathmatch honors the time and kill limits.
    pub fn is_over(&self, elapsed: Duration, top_kills: u32) -> bool {
        if self.mode != GameMode::DeathMatch {
            return false;
        }
        let time_up = !self.time_limit.is_zero() && elapsed >= self.time_limit;
        let kills_reached = self.kill_limit > 0 && top_kills >= self.kill_limit;
        time_up || kills_reached
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub rank: u32,
    pub player_id: u64,
    pub display_name: String,
    pub score: i32,
    pub kills: u32,
    pub deaths: u32,
}

/// Sorts by score, then kills, then fewest deaths, then id; ranks start at 1.
pub fn rank_entries(mut entries: Vec<RankEntry>) -> Vec<RankEntry> {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.kills.cmp(&a.kills))
            .then(a.deaths.cmp(&b.deaths))
            .then(a.player_id.cmp(&b.player_id))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    entries
}
