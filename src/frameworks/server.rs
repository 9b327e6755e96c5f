// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{
    create_lobby_handler, list_lobbies_handler, spawn_lobby_serializer, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyConfig, LobbyRegistry, LobbySettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route(
            "/lobbies",
            get(list_lobbies_handler).post(create_lobby_handler),
        )
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let (tuning, layout) = config::gameplay().inspect_err(|e| {
        tracing::error!(error = %e, "failed to load gameplay config");
    })?;
    tracing::debug!(
        width = layout.width,
        height = layout.height,
        spawn_points = layout.spawn_points.len(),
        "arena loaded"
    );

    // Owns the set of active lobby world tasks.
    let lobby_registry = Arc::new(LobbyRegistry::new(LobbySettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        idle_lobby_timeout: config::IDLE_LOBBY_TIMEOUT,
        layout: Arc::new(layout),
        tuning,
    }));

    // The default lobby is pinned so it restarts matches instead of closing.
    let default_lobby = lobby_registry
        .create_lobby(
            config::DEFAULT_LOBBY_ID.to_string(),
            LobbyConfig {
                mode: config::default_lobby_mode(),
                bot_count: config::default_lobby_bots(),
                time_limit: config::DEFAULT_MATCH_TIME_LIMIT,
                pinned: true,
                ..LobbyConfig::default()
            },
        )
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default lobby: {e:?}")))?;
    spawn_lobby_serializer(&default_lobby);

    Ok(Arc::new(AppState {
        lobby_registry,
        default_lobby_id: Arc::from(config::DEFAULT_LOBBY_ID),
    }))
}
