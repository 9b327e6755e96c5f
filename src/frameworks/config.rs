use crate::domain::{ArenaLayout, GameMode, GameplayTuning};
use serde::Deserialize;
use std::{env, io, path::Path, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn default_lobby_mode() -> GameMode {
    env::var("DEFAULT_LOBBY_MODE")
        .ok()
        .and_then(|v| GameMode::parse(&v))
        .unwrap_or_default()
}

pub fn default_lobby_bots() -> usize {
    env::var("DEFAULT_LOBBY_BOTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Default time limit for deathmatch lobbies (0 disables match end).
pub const DEFAULT_MATCH_TIME_LIMIT: Duration = Duration::from_secs(600);

// Unpinned lobbies with no connection after this long are removed.
pub const IDLE_LOBBY_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_LOBBY_ID: &str = "default";

/// Optional gameplay file: `[tuning.*]` tables plus an `[arena]` with layout rows.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GameplayFile {
    tuning: GameplayTuning,
    arena: Option<ArenaSection>,
}

#[derive(Debug, Deserialize)]
struct ArenaSection {
    rows: Vec<String>,
}

/// Gameplay tuning and arena, from `GAMEPLAY_CONFIG_PATH` when set, defaults otherwise.
pub fn gameplay() -> io::Result<(GameplayTuning, ArenaLayout)> {
    match env::var("GAMEPLAY_CONFIG_PATH") {
        Ok(path) if !path.trim().is_empty() => load_gameplay_file(Path::new(path.trim())),
        _ => Ok((GameplayTuning::default(), ArenaLayout::default())),
    }
}

pub fn load_gameplay_file(path: &Path) -> io::Result<(GameplayTuning, ArenaLayout)> {
    let text = std::fs::read_to_string(path)?;
    parse_gameplay(&text)
        .map_err(|e| io::Error::other(format!("invalid gameplay config {}: {e}", path.display())))
}

fn parse_gameplay(text: &str) -> Result<(GameplayTuning, ArenaLayout), String> {
    let file: GameplayFile = toml::from_str(text).map_err(|e| e.to_string())?;
    let layout = match file.arena {
        Some(arena) => ArenaLayout::parse(&arena.rows).map_err(|e| e.to_string())?,
        None => ArenaLayout::default(),
    };
    Ok((file.tuning, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gameplay_file_overrides_tuning_and_arena() {
        let (tuning, layout) = parse_gameplay(
            r#"
            [tuning.bomb]
            explode_through_bricks = true

            [arena]
            rows = ["S..", ".+.", "..S"]
            "#,
        )
        .unwrap();
        assert!(tuning.bomb.explode_through_bricks);
        assert_eq!(tuning.bomb.life_time, 2.0);
        assert_eq!((layout.width, layout.height), (3, 3));
        assert_eq!(layout.spawn_points.len(), 2);
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let (tuning, layout) = parse_gameplay("").unwrap();
        assert_eq!(tuning.character.respawn_seconds, 5.0);
        assert_eq!(layout.width, ArenaLayout::default().width);
    }

    #[test]
    fn bad_arena_is_reported() {
        let err = parse_gameplay("[arena]\nrows = [\"S.\", \".\"]").unwrap_err();
        assert!(err.contains("row"), "{err}");
    }
}
