use crate::domain::GameMode;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_lobby_serializer;
use crate::interface_adapters::protocol::ServerStateDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyConfig, LobbyError};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::{sync::Arc, time::Duration};
use tracing::warn;

const MAX_LOBBY_ID_LEN: usize = 64;
const MAX_BOTS: usize = 16;

#[derive(Debug, serde::Deserialize)]
pub struct LobbyInitRequest {
    // 1 to MAX_LOBBY_ID_LEN characters.
    lobby_id: String,
    // "io" or "deathmatch"; defaults to io.
    #[serde(default)]
    mode: Option<String>,
    // At most MAX_BOTS.
    #[serde(default)]
    bot_count: Option<usize>,
    // Zero disables the limit.
    #[serde(default)]
    time_limit_secs: Option<u64>,
    // Deathmatch only; zero disables the limit.
    #[serde(default)]
    kill_limit: Option<u32>,
    // Must be positive. Connections past it join as spectators.
    #[serde(default)]
    max_players: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
struct LobbyInitResponse {
    lobby_id: String,
}

#[derive(Debug, serde::Serialize)]
struct LobbySummaryDto {
    lobby_id: String,
    mode: &'static str,
    state: ServerStateDto,
    connections: usize,
    max_players: usize,
    pinned: bool,
}

#[derive(Debug, serde::Serialize)]
struct LobbyListResponse {
    lobbies: Vec<LobbySummaryDto>,
}

fn bad_request(error: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn lobby_config(payload: &LobbyInitRequest) -> Result<LobbyConfig, &'static str> {
    let defaults = LobbyConfig::default();
    let mode = match payload.mode.as_deref() {
        None => defaults.mode,
        Some(raw) => GameMode::parse(raw).ok_or("unknown mode")?,
    };
    let bot_count = payload.bot_count.unwrap_or(defaults.bot_count);
    if bot_count > MAX_BOTS {
        return Err("too many bots");
    }
    let max_players = payload.max_players.unwrap_or(defaults.max_players);
    if max_players == 0 {
        return Err("max_players must be positive");
    }

    Ok(LobbyConfig {
        mode,
        bot_count,
        time_limit: payload
            .time_limit_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.time_limit),
        kill_limit: payload.kill_limit.unwrap_or(defaults.kill_limit),
        max_players,
        // Created lobbies are not pinned; they go away on last disconnect or when left idle.
        pinned: false,
    })
}

pub async fn create_lobby_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LobbyInitRequest>,
) -> impl IntoResponse {
    // Ensure we have a lobby id to create.
    let lobby_id = payload.lobby_id.trim().to_string();
    if lobby_id.is_empty() {
        return bad_request("lobby_id is required");
    }
    if lobby_id.len() > MAX_LOBBY_ID_LEN {
        return bad_request("lobby_id is too long");
    }

    let config = match lobby_config(&payload) {
        Ok(config) => config,
        Err(reason) => {
            warn!(lobby_id = %lobby_id, reason, "rejected lobby request");
            return bad_request(reason);
        }
    };

    match state
        .lobby_registry
        .create_lobby(lobby_id.clone(), config)
        .await
    {
        Ok(lobby) => {
            // Create serializers so clients can subscribe immediately.
            spawn_lobby_serializer(&lobby);
            (StatusCode::CREATED, Json(LobbyInitResponse { lobby_id })).into_response()
        }
        Err(LobbyError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "lobby already exists".to_string(),
            }),
        )
            .into_response(),
    }
}

pub async fn list_lobbies_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let lobbies = state
        .lobby_registry
        .list_lobbies()
        .await
        .into_iter()
        .map(|l| LobbySummaryDto {
            lobby_id: l.lobby_id,
            mode: l.mode.as_str(),
            state: l.state.into(),
            connections: l.connections,
            max_players: l.max_players,
            pinned: l.pinned,
        })
        .collect();
    Json(LobbyListResponse { lobbies })
}
