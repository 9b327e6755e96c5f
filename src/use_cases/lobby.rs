// Lobby orchestration for spawning and managing arena worlds.

use crate::domain::{ArenaLayout, GameMode, GameplayTuning, MatchRules, PlayerId};
use crate::use_cases::game::{MatchSetup, world_task};
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound player input events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Fixed tick interval for the game loop.
    pub tick_interval: Duration,
    /// Unpinned lobbies nobody has connected to by then are removed.
    pub idle_lobby_timeout: Duration,
    /// Arena every lobby plays on.
    pub layout: Arc<ArenaLayout>,
    pub tuning: GameplayTuning,
}

/// Per-lobby match options chosen at creation time.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    pub mode: GameMode,
    pub bot_count: usize,
    /// Zero disables the time limit.
    pub time_limit: Duration,
    /// Zero disables the kill limit.
    pub kill_limit: u32,
    /// Connections beyond this join as spectators.
    pub max_players: usize,
    /// Pinned lobbies outlive their matches and their last connection.
    pub pinned: bool,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Io,
            bot_count: 0,
            time_limit: Duration::from_secs(600),
            kill_limit: 0,
            max_players: 8,
            pinned: false,
        }
    }
}

impl LobbyConfig {
    pub fn rules(&self) -> MatchRules {
        MatchRules {
            mode: self.mode,
            time_limit: self.time_limit,
            kill_limit: self.kill_limit,
            ..MatchRules::default()
        }
    }
}

/// Errors returned by lobby registry operations.
#[derive(Debug)]
pub enum LobbyError {
    /// Lobby already exists and cannot be re-created.
    AlreadyExists,
}

/// Per-lobby channels and access rules.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Identifier clients use to target this lobby.
    pub lobby_id: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for high-level server state changes.
    pub server_state_tx: watch::Sender<ServerState>,
    pub layout: Arc<ArenaLayout>,
    pub config: Arc<LobbyConfig>,
    /// Wakes the world task when the lobby is removed.
    shutdown: Arc<Notify>,
    /// Connected players that control a character.
    players: Arc<Mutex<HashSet<PlayerId>>>,
    /// Open sockets, spectators included.
    connections: Arc<AtomicUsize>,
}

impl LobbyHandle {
    /// Reserves a character slot; returns false once the lobby is full.
    pub async fn claim_player_slot(&self, player_id: PlayerId) -> bool {
        let mut players = self.players.lock().await;
        if players.len() >= self.config.max_players {
            return false;
        }
        players.insert(player_id)
    }

    pub async fn release_player_slot(&self, player_id: PlayerId) {
        self.players.lock().await.remove(&player_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ServerState {
        self.server_state_tx.borrow().clone()
    }
}

/// Lobby listing entry.
#[derive(Debug, Clone)]
pub struct LobbySummary {
    pub lobby_id: String,
    pub mode: GameMode,
    pub state: ServerState,
    pub connections: usize,
    pub max_players: usize,
    pub pinned: bool,
}

/// Thread-safe registry for active lobbies.
#[derive(Debug)]
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    /// Map of lobby id to active handle.
    lobbies: Arc<RwLock<HashMap<String, LobbyHandle>>>,
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("lobby_id", &self.lobby_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LobbyRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    /// Creates a new lobby and spawns its world task.
    pub async fn create_lobby(
        &self,
        lobby_id: String,
        config: LobbyConfig,
    ) -> Result<LobbyHandle, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists);
        }

        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        let setup = MatchSetup {
            layout: self.settings.layout.clone(),
            tuning: self.settings.tuning.clone(),
            rules: config.rules(),
            bot_count: config.bot_count,
            pinned: config.pinned,
            seed: rand::random(),
        };

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(world_task(
            input_rx,
            world_tx.clone(),
            server_state_tx.clone(),
            self.settings.tick_interval,
            shutdown.clone(),
            setup,
        ));

        info!(
            lobby_id = %lobby_id,
            mode = ?config.mode,
            bots = config.bot_count,
            max_players = config.max_players,
            pinned = config.pinned,
            "lobby created"
        );

        let connections = Arc::new(AtomicUsize::new(0));
        let lobby = LobbyHandle {
            lobby_id: Arc::from(lobby_id.clone()),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            server_state_tx: server_state_tx.clone(),
            layout: self.settings.layout.clone(),
            config: Arc::new(config),
            shutdown: shutdown.clone(),
            players: Arc::new(Mutex::new(HashSet::new())),
            connections: connections.clone(),
        };

        lobbies.insert(lobby_id.clone(), lobby.clone());
        drop(lobbies);

        if !lobby.config.pinned {
            self.remove_when_idle(lobby_id.clone(), connections, shutdown.clone());
        }
        self.remove_when_closed(lobby_id, server_state_tx.subscribe(), shutdown);
        Ok(lobby)
    }

    /// Drops the lobby from the registry once its world task reports `Closed`.
    fn remove_when_closed(
        &self,
        lobby_id: String,
        mut state_rx: watch::Receiver<ServerState>,
        shutdown: Arc<Notify>,
    ) {
        let lobbies = Arc::clone(&self.lobbies);
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                if *state_rx.borrow_and_update() == ServerState::Closed {
                    break;
                }
            }
            let mut lobbies = lobbies.write().await;
            // A lobby re-created under the same id has its own shutdown signal.
            if lobbies
                .get(&lobby_id)
                .is_some_and(|l| Arc::ptr_eq(&l.shutdown, &shutdown))
            {
                lobbies.remove(&lobby_id);
                info!(lobby_id = %lobby_id, "lobby closed");
            }
        });
    }

    /// Drops an unpinned lobby that is still empty once the idle timeout passes.
    ///
    /// Lobbies that did get a connection are left to `register_disconnect`.
    fn remove_when_idle(
        &self,
        lobby_id: String,
        connections: Arc<AtomicUsize>,
        shutdown: Arc<Notify>,
    ) {
        let lobbies = Arc::clone(&self.lobbies);
        let timeout = self.settings.idle_lobby_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut lobbies = lobbies.write().await;
            if connections.load(Ordering::Relaxed) > 0 {
                return;
            }
            if lobbies
                .get(&lobby_id)
                .is_some_and(|l| Arc::ptr_eq(&l.shutdown, &shutdown))
            {
                lobbies.remove(&lobby_id);
                shutdown.notify_one();
                info!(lobby_id = %lobby_id, "idle lobby removed");
            }
        });
    }

        /// Returns a lobby handle for the provided id, if it exists.
    pub async fn get_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_id).cloned()
    }

    pub async fn list_lobbies(&self) -> Vec<LobbySummary> {
        let lobbies = self.lobbies.read().await;
        let mut summaries: Vec<LobbySummary> = lobbies
            .values()
            .map(|l| LobbySummary {
                lobby_id: l.lobby_id.to_string(),
                mode: l.config.mode,
                state: l.state(),
                connections: l.connection_count(),
                max_players: l.config.max_players,
                pinned: l.config.pinned,
            })
            .collect();
        summaries.sort_by(|a, b| a.lobby_id.cmp(&b.lobby_id));
        summaries
    }

    /// Counts a new socket against the lobby; `None` if the lobby is gone.
    pub async fn register_connection(&self, lobby_id: &str) -> Option<usize> {
        let lobbies = self.lobbies.read().await;
        let lobby = lobbies.get(lobby_id)?;
        Some(lobby.connections.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Releases a socket; unpinned lobbies are removed with their last connection.
    pub async fn register_disconnect(&self, lobby_id: &str) {
        let mut lobbies = self.lobbies.write().await;
        let Some(lobby) = lobbies.get(lobby_id) else {
            return;
        };
        let remaining = lobby
            .connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        if remaining == 0 && !lobby.config.pinned {
            if let Some(lobby) = lobbies.remove(lobby_id) {
                lobby.shutdown.notify_one();
                info!(lobby_id, "lobby removed after last disconnect");
            }
        }
    }

    /// Removes a lobby and stops its world task.
    pub async fn remove_lobby(&self, lobby_id: &str) -> bool {
        let removed = self.lobbies.write().await.remove(lobby_id);
        match removed {
            Some(lobby) => {
                lobby.shutdown.notify_one();
                info!(lobby_id, "lobby removed");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LobbyRegistry {
        LobbyRegistry::new(LobbySettings {
            input_channel_capacity: 16,
            world_broadcast_capacity: 16,
            tick_interval: Duration::from_millis(50),
            idle_lobby_timeout: Duration::from_secs(60),
            layout: Arc::new(ArenaLayout::default()),
            tuning: GameplayTuning::default(),
        })
    }

    #[tokio::test]
    async fn duplicate_lobby_is_rejected() {
        let registry = registry();
        registry
            .create_lobby("alpha".into(), LobbyConfig::default())
            .await
            .unwrap();
        assert!(matches!(
            registry
                .create_lobby("alpha".into(), LobbyConfig::default())
                .await,
            Err(LobbyError::AlreadyExists)
        ));
        assert_eq!(registry.list_lobbies().await.len(), 1);
    }

    #[tokio::test]
    async fn last_disconnect_removes_unpinned_lobby() {
        let registry = registry();
        registry
            .create_lobby("temp".into(), LobbyConfig::default())
            .await
            .unwrap();
        registry
            .create_lobby(
                "home".into(),
                LobbyConfig {
                    pinned: true,
                    ..LobbyConfig::default()
                },
            )
            .await
            .unwrap();

        for id in ["temp", "home"] {
            assert_eq!(registry.register_connection(id).await, Some(1));
            registry.register_disconnect(id).await;
        }
        assert!(registry.get_lobby("temp").await.is_none());
        assert!(registry.get_lobby("home").await.is_some());
        assert_eq!(registry.register_connection("temp").await, None);
    }

    #[tokio::test]
    async fn full_lobby_turns_players_into_spectators() {
        let registry = registry();
        let lobby = registry
            .create_lobby(
                "duo".into(),
                LobbyConfig {
                    max_players: 2,
                    ..LobbyConfig::default()
                },
            )
            .await
            .unwrap();

        assert!(lobby.claim_player_slot(1).await);
        assert!(lobby.claim_player_slot(2).await);
        assert!(!lobby.claim_player_slot(3).await);
        lobby.release_player_slot(1).await;
        assert!(lobby.claim_player_slot(3).await);
    }

    #[tokio::test(start_paused = true)]
    async fn unjoined_lobby_is_removed_after_idle_timeout() {
        let registry = registry();
        let idle = registry
            .create_lobby("idle".into(), LobbyConfig::default())
            .await
            .unwrap();
        registry
            .create_lobby("busy".into(), LobbyConfig::default())
            .await
            .unwrap();
        registry
            .create_lobby(
                "home".into(),
                LobbyConfig {
                    pinned: true,
                    ..LobbyConfig::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(registry.register_connection("busy").await, Some(1));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(registry.get_lobby("idle").await.is_some());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(registry.get_lobby("idle").await.is_none());
        assert!(registry.get_lobby("busy").await.is_some());
        assert!(registry.get_lobby("home").await.is_some());

        let mut state_rx = idle.server_state_tx.subscribe();
        while *state_rx.borrow_and_update() != ServerState::Closed {
            state_rx.changed().await.unwrap();
        }
    }
}
