// Wire protocol DTOs and conversions for public game server messages.
// Player ids travel as strings; bot ids do not fit in a JSON number.

use crate::domain::blast::{Blast, BlastTile};
use crate::domain::state::{BombSnapshot, CharacterSnapshot, PowerUpSnapshot};
use crate::domain::{ArenaLayout, Cell, Direction, PlayerInput, PowerUpKind, RankEntry, WorldEvent};
use crate::use_cases::{ServerState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String, spectator: bool },
    // Static arena description, sent once after Identity.
    ArenaInit(ArenaInitDto),
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
    // High-level server state transitions (lobby, match start/end).
    GameState(ServerStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message.
    Join(JoinPayload),
    // Input messages sent after a successful Join.
    Input(PlayerInputDto),
    // Request to come back after dying.
    Respawn,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
}

/// Per-tick input payload sent by the client after joining.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerInputDto {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub move_z: f32,
    #[serde(default)]
    pub plant_bomb: bool,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            move_x: input.move_x,
            move_z: input.move_z,
            plant_bomb: input.plant_bomb,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CellDto {
    pub x: i32,
    pub z: i32,
}

impl From<Cell> for CellDto {
    fn from(cell: Cell) -> Self {
        Self {
            x: cell.x,
            z: cell.z,
        }
    }
}

fn cells(cells: impl IntoIterator<Item = Cell>) -> Vec<CellDto> {
    cells.into_iter().map(CellDto::from).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ArenaInitDto {
    pub width: i32,
    pub height: i32,
    pub walls: Vec<CellDto>,
    pub bricks: Vec<CellDto>,
    pub spawn_points: Vec<CellDto>,
}

impl From<&ArenaLayout> for ArenaInitDto {
    fn from(layout: &ArenaLayout) -> Self {
        Self {
            width: layout.width,
            height: layout.height,
            walls: cells(layout.walls()),
            bricks: cells(layout.bricks.iter().copied()),
            spawn_points: cells(layout.spawn_points.iter().copied()),
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub characters: Vec<CharacterDto>,
    pub bombs: Vec<BombDto>,
    pub destroyed_bricks: Vec<CellDto>,
    pub power_ups: Vec<PowerUpDto>,
    pub events: Vec<EventDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rankings: Option<Vec<RankDto>>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        let snapshot = update.snapshot;
        Self {
            tick: update.tick,
            characters: snapshot.characters.iter().map(CharacterDto::from).collect(),
            bombs: snapshot.bombs.iter().map(BombDto::from).collect(),
            destroyed_bricks: cells(snapshot.destroyed_bricks),
            power_ups: snapshot.power_ups.iter().map(PowerUpDto::from).collect(),
            events: update.events.iter().map(EventDto::from).collect(),
            rankings: update
                .rankings
                .map(|ranks| ranks.iter().map(RankDto::from).collect()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterDto {
    pub id: String,
    pub display_name: String,
    pub is_bot: bool,
    pub x: f32,
    pub z: f32,
    pub alive: bool,
    pub invincible: bool,
    pub hearts: i32,
    pub bomb_range: u32,
    pub bomb_limit: usize,
    pub move_speed: f32,
    pub can_kick: bool,
    pub score: i32,
    pub kills: u32,
    pub deaths: u32,
}

impl From<&CharacterSnapshot> for CharacterDto {
    fn from(c: &CharacterSnapshot) -> Self {
        Self {
            id: c.id.to_string(),
            display_name: c.display_name.clone(),
            is_bot: c.is_bot,
            x: c.x,
            z: c.z,
            alive: c.alive,
            invincible: c.invincible,
            hearts: c.hearts,
            bomb_range: c.bomb_range,
            bomb_limit: c.bomb_limit,
            move_speed: c.move_speed,
            can_kick: c.can_kick,
            score: c.score,
            kills: c.kills,
            deaths: c.deaths,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BombDto {
    pub id: u64,
    pub owner_id: Option<String>,
    pub cell: CellDto,
    pub range: u32,
    pub fuse: f32,
    pub sliding: bool,
}

impl From<&BombSnapshot> for BombDto {
    fn from(b: &BombSnapshot) -> Self {
        Self {
            id: b.id,
            owner_id: b.owner_id.map(|id| id.to_string()),
            cell: b.cell.into(),
            range: b.range,
            fuse: b.fuse,
            sliding: b.sliding,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpDto {
    pub id: u64,
    pub kind: PowerUpKind,
    pub cell: CellDto,
}

impl From<&PowerUpSnapshot> for PowerUpDto {
    fn from(p: &PowerUpSnapshot) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            cell: p.cell.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankDto {
    pub rank: u32,
    pub player_id: String,
    pub display_name: String,
    pub score: i32,
    pub kills: u32,
    pub deaths: u32,
}

impl From<&RankEntry> for RankDto {
    fn from(r: &RankEntry) -> Self {
        Self {
            rank: r.rank,
            player_id: r.player_id.to_string(),
            display_name: r.display_name.clone(),
            score: r.score,
            kills: r.kills,
            deaths: r.deaths,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    Forward,
    Right,
    Back,
    Left,
}

impl From<Direction> for DirectionDto {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => DirectionDto::Forward,
            Direction::Right => DirectionDto::Right,
            Direction::Back => DirectionDto::Back,
            Direction::Left => DirectionDto::Left,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlastTileDto {
    pub cell: CellDto,
    pub direction: Option<DirectionDto>,
    pub distance: u32,
    pub blocked: bool,
}

impl From<&BlastTile> for BlastTileDto {
    fn from(t: &BlastTile) -> Self {
        Self {
            cell: t.cell.into(),
            direction: t.direction.map(DirectionDto::from),
            distance: t.distance,
            blocked: t.blocked,
        }
    }
}

/// Gameplay events for effects and the kill feed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDto {
    CharacterSpawned {
        player_id: String,
        cell: CellDto,
    },
    CharacterDamaged {
        player_id: String,
        hearts_left: i32,
    },
    Kill {
        killer_id: Option<String>,
        victim_id: String,
        suicide: bool,
    },
    BombPlanted {
        bomb_id: u64,
        owner_id: Option<String>,
        cell: CellDto,
        range: u32,
    },
    BombKicked {
        bomb_id: u64,
        kicker_id: String,
        direction: DirectionDto,
    },
    BombExploded {
        bomb_id: u64,
        owner_id: Option<String>,
        center: CellDto,
        tiles: Vec<BlastTileDto>,
    },
    BrickDestroyed {
        cell: CellDto,
    },
    BrickRestored {
        cell: CellDto,
    },
    PowerUpSpawned {
        power_up_id: u64,
        power_up: PowerUpKind,
        cell: CellDto,
    },
    PowerUpDestroyed {
        power_up_id: u64,
        cell: CellDto,
    },
    PowerUpCollected {
        player_id: String,
        power_up_id: u64,
        power_up: PowerUpKind,
        cell: CellDto,
    },
}

impl From<&Blast> for EventDto {
    fn from(blast: &Blast) -> Self {
        EventDto::BombExploded {
            bomb_id: blast.bomb_id,
            owner_id: blast.owner_id.map(|id| id.to_string()),
            center: blast.center.into(),
            tiles: blast.tiles.iter().map(BlastTileDto::from).collect(),
        }
    }
}

impl From<&WorldEvent> for EventDto {
    fn from(event: &WorldEvent) -> Self {
        match event {
            WorldEvent::CharacterSpawned { player_id, cell } => EventDto::CharacterSpawned {
                player_id: player_id.to_string(),
                cell: (*cell).into(),
            },
            WorldEvent::CharacterDamaged {
                player_id,
                hearts_left,
            } => EventDto::CharacterDamaged {
                player_id: player_id.to_string(),
                hearts_left: *hearts_left,
            },
            WorldEvent::Kill {
                killer_id,
                victim_id,
                suicide,
            } => EventDto::Kill {
                killer_id: killer_id.map(|id| id.to_string()),
                victim_id: victim_id.to_string(),
                suicide: *suicide,
            },
            WorldEvent::BombPlanted {
                bomb_id,
                owner_id,
                cell,
                range,
            } => EventDto::BombPlanted {
                bomb_id: *bomb_id,
                owner_id: owner_id.map(|id| id.to_string()),
                cell: (*cell).into(),
                range: *range,
            },
            WorldEvent::BombKicked {
                bomb_id,
                kicker_id,
                direction,
            } => EventDto::BombKicked {
                bomb_id: *bomb_id,
                kicker_id: kicker_id.to_string(),
                direction: (*direction).into(),
            },
            WorldEvent::BombExploded(blast) => EventDto::from(blast),
            WorldEvent::BrickDestroyed { cell } => EventDto::BrickDestroyed {
                cell: (*cell).into(),
            },
            WorldEvent::BrickRestored { cell } => EventDto::BrickRestored {
                cell: (*cell).into(),
            },
            WorldEvent::PowerUpSpawned {
                power_up_id,
                kind,
                cell,
            } => EventDto::PowerUpSpawned {
                power_up_id: *power_up_id,
                power_up: *kind,
                cell: (*cell).into(),
            },
            WorldEvent::PowerUpDestroyed { power_up_id, cell } => EventDto::PowerUpDestroyed {
                power_up_id: *power_up_id,
                cell: (*cell).into(),
            },
            WorldEvent::PowerUpCollected {
                player_id,
                power_up_id,
                kind,
                cell,
            } => EventDto::PowerUpCollected {
                player_id: player_id.to_string(),
                power_up_id: *power_up_id,
                power_up: *kind,
                cell: (*cell).into(),
            },
        }
    }
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded { closes_in: u32 },
    Closed,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby => ServerStateDto::Lobby,
            ServerState::MatchStarting { in_seconds } => {
                ServerStateDto::MatchStarting { in_seconds }
            }
            ServerState::MatchRunning => ServerStateDto::MatchRunning,
            ServerState::MatchEnded { closes_in } => ServerStateDto::MatchEnded { closes_in },
            ServerState::Closed => ServerStateDto::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorldSnapshot;
    use serde_json::json;

    #[test]
    fn parses_client_messages() {
        let join: ClientMessage =
            serde_json::from_str(r#"{"type":"Join","data":{"display_name":"ada"}}"#).unwrap();
        assert!(matches!(join, ClientMessage::Join(p) if p.display_name == "ada"));

        let input: ClientMessage =
            serde_json::from_str(r#"{"type":"Input","data":{"move_x":1.0}}"#).unwrap();
        let ClientMessage::Input(input) = input else {
            panic!("expected input");
        };
        assert_eq!(input.move_z, 0.0);
        assert!(!input.plant_bomb);

        let respawn: ClientMessage = serde_json::from_str(r#"{"type":"Respawn"}"#).unwrap();
        assert!(matches!(respawn, ClientMessage::Respawn));
    }

    #[test]
    fn explosion_event_serializes_with_tiles() {
        let blast = Blast {
            bomb_id: 4,
            owner_id: Some(9),
            center: Cell::new(1, 1),
            tiles: vec![
                BlastTile {
                    cell: Cell::new(1, 1),
                    direction: None,
                    distance: 0,
                    blocked: false,
                },
                BlastTile {
                    cell: Cell::new(2, 1),
                    direction: Some(Direction::Right),
                    distance: 1,
                    blocked: true,
                },
            ],
        };
        let update = WorldUpdate {
            tick: 3,
            snapshot: WorldSnapshot::default(),
            events: vec![WorldEvent::BombExploded(blast)],
            rankings: None,
        };
        let msg = ServerMessage::WorldUpdate(update.into());
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "WorldUpdate");
        assert!(value["data"].get("rankings").is_none());
        let event = &value["data"]["events"][0];
        assert_eq!(event["kind"], "bomb_exploded");
        assert_eq!(event["owner_id"], "9");
        assert_eq!(event["tiles"][1]["direction"], "right");
        assert_eq!(event["tiles"][1]["cell"], json!({ "x": 2, "z": 1 }));
    }

    #[test]
    fn arena_init_lists_static_cells() {
        let layout = ArenaLayout::parse(&["#S+", "..."]).unwrap();
        let value = serde_json::to_value(ServerMessage::ArenaInit((&layout).into())).unwrap();
        assert_eq!(value["data"]["width"], 3);
        assert_eq!(value["data"]["walls"], json!([{ "x": 0, "z": 0 }]));
        assert_eq!(value["data"]["bricks"], json!([{ "x": 2, "z": 0 }]));
    }
}
