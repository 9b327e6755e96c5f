use crate::domain::PlayerInput;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ArenaInitDto, ClientMessage, ServerMessage, WorldUpdateDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{GameEvent, LobbyHandle, LobbyRegistry, ServerState, WorldUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch::Receiver;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

#[derive(Debug, serde::Deserialize)]
pub struct LobbyQuery {
    // The lobby id the client wants to join.
    #[serde(default)]
    lobby_id: Option<String>,
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_lobby_serializer(lobby: &LobbyHandle) {
    tokio::spawn(world_update_serializer(
        lobby.world_tx.subscribe(),
        lobby.world_bytes_tx.clone(),
        lobby.world_latest_tx.clone(),
    ));
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> impl IntoResponse {
    let lobby_id = query
        .lobby_id
        .unwrap_or_else(|| state.default_lobby_id.to_string());

    let lobby = match state.lobby_registry.get_lobby(&lobby_id).await {
        Some(lobby) => lobby,
        None => {
            // Keep not-found responses consistent with the JSON error schema.
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "lobby not found".to_string(),
                }),
            )
                .into_response();
        }
    };

    let lobby_registry = state.lobby_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, lobby, lobby_registry))
}

async fn handle_socket(socket: WebSocket, lobby: LobbyHandle, lobby_registry: Arc<LobbyRegistry>) {
    let player_id = rand_id();
    let span = info_span!("conn", player_id, lobby_id = %lobby.lobby_id);
    serve_connection(socket, player_id, lobby, lobby_registry)
        .instrument(span)
        .await;
}

async fn serve_connection(
    mut socket: WebSocket,
    player_id: u64,
    lobby: LobbyHandle,
    lobby_registry: Arc<LobbyRegistry>,
) {
    // Count the socket first so an unpinned lobby is not removed mid-handshake.
    if lobby_registry
        .register_connection(&lobby.lobby_id)
        .await
        .is_none()
    {
        warn!("lobby missing during connection registration");
        let _ = send_close_with_reason(&mut socket, close_code::POLICY, "lobby unavailable").await;
        return;
    }

    let mut ctx = match bootstrap_connection(&mut socket, player_id, &lobby, lobby_registry.clone()).await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            match e {
                NetError::ClosedBeforeJoin => info!("client disconnected before join handshake"),
                e => warn!(error = ?e, "failed to bootstrap connection"),
            }
            lobby.release_player_slot(player_id).await;
            lobby_registry.register_disconnect(&lobby.lobby_id).await;
            return;
        }
    };

    info!(
        display_name = %ctx.display_name,
        spectator = !ctx.can_spawn,
        "client connected"
    );

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: u64,
    pub display_name: String,
    // Lobby id this connection is attached to.
    pub lobby_id: Arc<str>,
    // Registry access for connection lifecycle updates.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Lobby handle for player slot cleanup.
    pub lobby: LobbyHandle,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    pub server_state_rx: watch::Receiver<ServerState>,
    // False for spectators that connected after the lobby filled up.
    pub can_spawn: bool,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    display_name: String,
    bytes_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    player_id: u64,
    lobby: &LobbyHandle,
    lobby_registry: Arc<LobbyRegistry>,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = lobby.world_bytes_tx.subscribe();
    let world_latest_rx = lobby.world_latest_tx.subscribe();
    let server_state_rx = lobby.server_state_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Connections beyond the player cap watch without a character.
    let can_spawn = lobby.claim_player_slot(player_id).await;

    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
        spectator: !can_spawn,
    };
    send_message(socket, &identity_msg).await?;
    send_message(
        socket,
        &ServerMessage::ArenaInit(ArenaInitDto::from(lobby.layout.as_ref())),
    )
    .await?;

    if can_spawn {
        // Join happens before initial state so the next snapshot includes the new character.
        // If anything after Join fails, compensate with Leave.
        lobby
            .input_tx
            .send(GameEvent::Join {
                player_id,
                display_name: join.display_name.clone(),
            })
            .await
            .map_err(|_| NetError::InputClosed)?;
    }

    // Clone as soon as we borrow to avoid holding the lock across an await.
    let initial_state = server_state_rx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    if let Err(e) = send_message(socket, &state_msg).await {
        if can_spawn {
            lobby
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
        }
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        display_name: join.display_name,
        lobby_id: lobby.lobby_id.clone(),
        lobby_registry,
        lobby: lobby.clone(),
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        input_tx: lobby.input_tx.clone(),
        can_spawn,
        lag_recovery_count: 0,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_CHARS: usize = 24;
const DEFAULT_DISPLAY_NAME: &str = "Player";
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

/// Trims control characters and whitespace and caps the length.
fn sanitize_display_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect();
    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name
    }
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(ClientMessage::Input(_) | ClientMessage::Respawn) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                return Ok(JoinHandshake {
                    display_name: sanitize_display_name(&payload.display_name),
                    bytes_in,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_input(mut input: PlayerInput) -> Option<PlayerInput> {
    if !input.move_x.is_finite() || !input.move_z.is_finite() {
        return None;
    }

    input.move_x = input.move_x.clamp(-1.0, 1.0);
    input.move_z = input.move_z.clamp(-1.0, 1.0);

    Some(input)
}

fn forward_event(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

fn process_input_message(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    input: PlayerInput,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(input) = sanitize_input(input) else {
        if should_log(last_invalid_input_log) {
            warn!(player_id, "invalid input values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    };

    forward_event(
        player_id,
        input_tx,
        GameEvent::Input { player_id, input },
        last_input_full_log,
    )
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        lobby_id,
        lobby_registry,
        lobby,
        input_tx,
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        can_spawn,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_world_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    *can_spawn,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing World Update
            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            let bytes_len = latest.len();
                            *lag_recovery_count += 1;
                            let outcome =
                                forward_world_bytes(latest, socket, msgs_out, bytes_out).await;

                            if should_log(last_world_lag_log) {
                                debug!(
                                    player_id,
                                    bytes = bytes_len,
                                    count = *lag_recovery_count,
                                    "sent lag recovery snapshot"
                                );
                            }

                            match outcome {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            // Outgoing Server State
            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => match forward_server_state(server_state_rx, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(_) => {
                        warn!(player_id, "server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    let stats = ConnStats {
        msgs_in: *msgs_in,
        msgs_out: *msgs_out,
        bytes_in: *bytes_in,
        bytes_out: *bytes_out,
        invalid_json: *invalid_json,
        lag_recovery_count: *lag_recovery_count,
    };
    if let Err(e) = disconnect_cleanup(
        player_id,
        lobby_id,
        lobby_registry,
        lobby,
        input_tx,
        *can_spawn,
        stats,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    can_spawn: bool,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(_) if !can_spawn => {
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "spectator input ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Input(input)) => process_input_message(
                        player_id,
                        input_tx,
                        input.into(),
                        last_input_full_log,
                        last_invalid_input_log,
                    ),
                    Ok(ClientMessage::Respawn) => forward_event(
                        player_id,
                        input_tx,
                        GameEvent::Respawn { player_id },
                        last_input_full_log,
                    ),
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn forward_server_state(
    server_state_rx: &mut Receiver<ServerState>,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let st = server_state_rx.borrow_and_update().clone();
    let closed = st == ServerState::Closed;
    let msg = ServerMessage::GameState(st.into());
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
        }
        Err(err) => {
            warn!(error = ?err, "failed to send server state");
            return LoopControl::Disconnect;
        }
    }

    if closed {
        // The world task is gone; nothing else will arrive on this socket.
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "lobby closed".into(),
            })))
            .await;
        return LoopControl::Disconnect;
    }
    LoopControl::Continue
}

struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
}

async fn disconnect_cleanup(
    player_id: u64,
    lobby_id: &Arc<str>,
    lobby_registry: &Arc<LobbyRegistry>,
    lobby: &LobbyHandle,
    input_tx: &mpsc::Sender<GameEvent>,
    can_spawn: bool,
    stats: ConnStats,
) -> Result<(), NetError> {
    let mut result = Ok(());
    if can_spawn {
        lobby.release_player_slot(player_id).await;
        // A closed lobby has no world task left to tell.
        if input_tx.send(GameEvent::Leave { player_id }).await.is_err()
            && lobby.state() != ServerState::Closed
        {
            result = Err(NetError::InputClosed);
        }
    }

    // Spectators keep lobbies alive too, so count every socket.
    lobby_registry.register_disconnect(lobby_id).await;

    debug!(
        player_id,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_json = stats.invalid_json,
        lag_recovery_count = stats.lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_trimmed_and_capped() {
        assert_eq!(sanitize_display_name("  ada \n"), "ada");
        assert_eq!(sanitize_display_name("\u{7}\t "), DEFAULT_DISPLAY_NAME);
        assert_eq!(sanitize_display_name(&"x".repeat(40)).len(), MAX_DISPLAY_NAME_CHARS);
    }

    #[test]
    fn input_is_clamped_and_non_finite_dropped() {
        let input = sanitize_input(PlayerInput {
            move_x: 3.0,
            move_z: -0.5,
            plant_bomb: true,
        })
        .unwrap();
        assert_eq!((input.move_x, input.move_z), (1.0, -0.5));
        assert!(
            sanitize_input(PlayerInput {
                move_x: f32::NAN,
                ..PlayerInput::default()
            })
            .is_none()
        );
    }
}
