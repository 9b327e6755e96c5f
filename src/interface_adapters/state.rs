use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Registry of active lobbies and their world channels.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Lobby used when a client connects without a lobby_id.
    pub default_lobby_id: Arc<str>,
}
