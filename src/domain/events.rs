// Events emitted by the world after each mutation; drained once per tick.

use crate::domain::blast::Blast;
use crate::domain::grid::{Cell, Direction};
use crate::domain::power_ups::PowerUpKind;
use crate::domain::state::{BombId, PlayerId, PowerUpId};

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    CharacterSpawned {
        player_id: PlayerId,
        cell: Cell,
    },
    CharacterDamaged {
        player_id: PlayerId,
        hearts_left: i32,
    },
    Kill {
        /// `None` when the bomb's planter already left.
        killer_id: Option<PlayerId>,
        victim_id: PlayerId,
        suicide: bool,
    },
    BombPlanted {
        bomb_id: BombId,
        owner_id: Option<PlayerId>,
        cell: Cell,
        range: u32,
    },
    BombKicked {
        bomb_id: BombId,
        kicker_id: PlayerId,
        direction: Direction,
    },
    BombExploded(Blast),
    BrickDestroyed {
        cell: Cell,
    },
    BrickRestored {
        cell: Cell,
    },
    PowerUpSpawned {
        power_up_id: PowerUpId,
        kind: PowerUpKind,
        cell: Cell,
    },
    PowerUpDestroyed {
        power_up_id: PowerUpId,
        cell: Cell,
    },
    PowerUpCollected {
        player_id: PlayerId,
        power_up_id: PowerUpId,
        kind: PowerUpKind,
        cell: Cell,
    },
}
