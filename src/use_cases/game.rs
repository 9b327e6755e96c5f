use super::types::{GameEvent, ServerState, WorldUpdate};
use crate::domain::{ArenaLayout, GameplayTuning, MatchRules, PlayerId, World};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Seconds announced before every match.
const START_COUNTDOWN_SECS: u32 = 3;

/// Bot ids live in the upper half of the id space so they never collide with connections.
const BOT_ID_BASE: PlayerId = 1 << 63;

/// Everything a lobby's world task needs to run its matches.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub layout: Arc<ArenaLayout>,
    pub tuning: GameplayTuning,
    pub rules: MatchRules,
    pub bot_count: usize,
    /// Pinned lobbies start a new match instead of closing.
    pub pinned: bool,
    pub seed: u64,
}

enum MatchOutcome {
    Finished,
    Shutdown,
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
    setup: MatchSetup,
) {
    let mut world = World::new(
        setup.layout.clone(),
        setup.tuning.clone(),
        setup.rules,
        setup.seed,
    );
    add_bots(&mut world, &setup);

    let mut tick: u64 = 0;
    loop {
        if !countdown(&server_state_tx, &shutdown).await {
            break;
        }

        publish_state(&server_state_tx, ServerState::MatchRunning);
        info!(mode = ?setup.rules.mode, bots = setup.bot_count, "match started");

        let outcome = run_match(
            &mut world,
            &mut tick,
            &mut input_rx,
            &world_tx,
            &server_state_tx,
            tick_interval,
            &shutdown,
        )
        .await;

        match outcome {
            MatchOutcome::Shutdown => break,
            MatchOutcome::Finished if !setup.pinned => break,
            MatchOutcome::Finished => {
                info!("restarting match in pinned lobby");
                world.reset_match();
            }
        }
    }

    publish_state(&server_state_tx, ServerState::Closed);
    info!(tick, "world task stopped");
}

fn add_bots(world: &mut World, setup: &MatchSetup) {
    let names = &setup.tuning.bots.names;
    for i in 0..setup.bot_count {
        let name = match names.get(i % names.len().max(1)) {
            Some(name) if i < names.len() => name.clone(),
            Some(name) => format!("{name} {}", i / names.len() + 1),
            None => format!("Bot {}", i + 1),
        };
        world.add_bot(BOT_ID_BASE + i as PlayerId, name);
    }
}

/// Announces the start countdown; returns false if the lobby shut down meanwhile.
async fn countdown(server_state_tx: &watch::Sender<ServerState>, shutdown: &Notify) -> bool {
    for remaining in (1..=START_COUNTDOWN_SECS).rev() {
        publish_state(
            server_state_tx,
            ServerState::MatchStarting {
                in_seconds: remaining,
            },
        );
        tokio::select! {
            _ = shutdown.notified() => return false,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }
    true
}

async fn run_match(
    world: &mut World,
    tick: &mut u64,
    input_rx: &mut mpsc::Receiver<GameEvent>,
    world_tx: &broadcast::Sender<WorldUpdate>,
    server_state_tx: &watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: &Notify,
) -> MatchOutcome {
    let rules = *world.rules();
    let ranking_period = world.tuning().score.update_score_seconds;
    let dt = tick_interval.as_secs_f32();

    // Drive the fixed-step game loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    let mut elapsed = Duration::ZERO;
    let mut since_rankings = 0.0f32;
    let mut ended_at: Option<Duration> = None;

    loop {
        let stop = tokio::select! {
            _ = shutdown.notified() => true,
            _ = interval.tick() => false,
        };
        if stop {
            return MatchOutcome::Shutdown;
        }

        while let Ok(ev) = input_rx.try_recv() {
            apply_event(world, ev);
        }

        let events = world.tick(dt);
        elapsed += tick_interval;
        *tick += 1;

        let mut publish_rankings = false;
        if ended_at.is_none() && rules.is_over(elapsed, world.top_kills()) {
            world.end_match();
            ended_at = Some(elapsed);
            publish_rankings = true;
            info!(
                elapsed_secs = elapsed.as_secs(),
                top_kills = world.top_kills(),
                "match over"
            );
        }

        since_rankings += dt;
        if since_rankings >= ranking_period {
            since_rankings = 0.0;
            publish_rankings = true;
        }

        let _ = world_tx.send(WorldUpdate {
            tick: *tick,
            snapshot: world.snapshot(),
            events,
            rankings: publish_rankings.then(|| world.rankings()),
        });

        if let Some(at) = ended_at {
            let remaining = rules.end_countdown.saturating_sub(elapsed - at);
            publish_state(
                server_state_tx,
                ServerState::MatchEnded {
                    closes_in: remaining.as_secs_f32().ceil() as u32,
                },
            );
            if remaining.is_zero() {
                return MatchOutcome::Finished;
            }
        }
    }
}

fn apply_event(world: &mut World, ev: GameEvent) {
    match ev {
        GameEvent::Join {
            player_id,
            display_name,
        } => {
            if world.join(player_id, display_name) {
                info!(player_id, "player joined");
            } else {
                warn!(player_id, "duplicate join ignored");
            }
        }
        GameEvent::Leave { player_id } => {
            if world.leave(player_id) {
                info!(player_id, "player left");
            }
        }
        GameEvent::Input { player_id, input } => world.set_input(player_id, input),
        GameEvent::Respawn { player_id } => {
            if let Err(reason) = world.respawn(player_id) {
                debug!(player_id, ?reason, "respawn rejected");
            }
        }
    }
}

/// Sends a state change only when it differs from the current one.
fn publish_state(server_state_tx: &watch::Sender<ServerState>, state: ServerState) {
    server_state_tx.send_if_modified(|current| {
        if *current == state {
            false
        } else {
            *current = state;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameMode, PlayerInput};

    fn setup(rules: MatchRules, pinned: bool) -> MatchSetup {
        MatchSetup {
            layout: Arc::new(ArenaLayout::default()),
            tuning: GameplayTuning::default(),
            rules,
            bot_count: 2,
            pinned,
            seed: 7,
        }
    }

    #[test]
    fn bots_get_distinct_names_and_ids() {
        let mut world = World::new(
            Arc::new(ArenaLayout::default()),
            GameplayTuning::default(),
            MatchRules::default(),
            1,
        );
        let mut s = setup(MatchRules::default(), true);
        s.bot_count = 8;
        add_bots(&mut world, &s);

        let bots: Vec<_> = world.characters().filter(|c| c.is_bot).collect();
        assert_eq!(bots.len(), 8);
        assert_eq!(bots[6].display_name, "Blinky 2");
        assert!(bots.iter().all(|c| c.id >= BOT_ID_BASE));
    }

    #[tokio::test(start_paused = true)]
    async fn deathmatch_ends_and_closes_unpinned_lobby() {
        let (input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, mut world_rx) = broadcast::channel(4096);
        let (state_tx, mut state_rx) = watch::channel(ServerState::Lobby);
        let rules = MatchRules {
            mode: GameMode::DeathMatch,
            time_limit: Duration::from_secs(2),
            kill_limit: 0,
            end_countdown: Duration::from_secs(1),
        };

        let task = tokio::spawn(world_task(
            input_rx,
            world_tx,
            state_tx,
            Duration::from_millis(50),
            Arc::new(Notify::new()),
            setup(rules, false),
        ));

        input_tx
            .send(GameEvent::Join {
                player_id: 1,
                display_name: "ada".into(),
            })
            .await
            .unwrap();
        input_tx
            .send(GameEvent::Input {
                player_id: 1,
                input: PlayerInput::default(),
            })
            .await
            .unwrap();

        let mut saw_ended = false;
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            if matches!(state, ServerState::MatchEnded { .. }) {
                saw_ended = true;
            }
            if state == ServerState::Closed {
                break;
            }
        }
        task.await.unwrap();
        assert!(saw_ended);

        let mut last_rankings = None;
        while let Ok(update) = world_rx.try_recv() {
            if update.rankings.is_some() {
                last_rankings = update.rankings;
            }
        }
        let rankings = last_rankings.expect("rankings were published");
        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].rank, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let (_input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, _world_rx) = broadcast::channel(16);
        let (state_tx, state_rx) = watch::channel(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(world_task(
            input_rx,
            world_tx,
            state_tx,
            Duration::from_millis(50),
            shutdown.clone(),
            setup(MatchRules::default(), true),
        ));
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown.notify_one();
        task.await.unwrap();
        assert_eq!(*state_rx.borrow(), ServerState::Closed);
    }
}
