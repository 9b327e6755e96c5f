// Domain-level arena entities and input/snapshot types.

use crate::domain::grid::{Cell, Direction};
use crate::domain::power_ups::PowerUpKind;
use crate::domain::stats::{CharacterStats, StatCaps};
use crate::domain::systems::bots::BotBrain;
use crate::domain::tuning::CharacterTuning;

pub type PlayerId = u64;
pub type BombId = u64;
pub type PowerUpId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_z: f32,
    /// Consumed by the next tick; planting is not held down.
    pub plant_bomb: bool,
}

#[derive(Debug)]
pub struct Character {
    pub id: PlayerId,
    pub display_name: String,
    pub is_bot: bool,
    pub x: f32,
    pub z: f32,

    // Loadout stats and everything collected on top of them.
    pub base_stats: CharacterStats,
    pub add_stats: CharacterStats,

    pub is_dead: bool,
    pub death_time: f32,
    pub invincible_since: Option<f32>,

    // Scoreboard.
    pub score: i32,
    pub kill_count: u32,
    pub die_count: u32,

    /// Bombs planted by this character that have not exploded yet.
    pub active_bombs: Vec<BombId>,
    pub last_input: PlayerInput,
    pub(crate) brain: Option<BotBrain>,
}

impl Character {
    pub(crate) fn new(id: PlayerId, display_name: String, base_stats: CharacterStats) -> Self {
        Self {
            id,
            display_name,
            is_bot: false,
            x: 0.0,
            z: 0.0,
            base_stats,
            add_stats: base_stats,
            is_dead: true,
            death_time: 0.0,
            invincible_since: None,
            score: 0,
            kill_count: 0,
            die_count: 0,
            active_bombs: Vec::new(),
            last_input: PlayerInput::default(),
            brain: None,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::from_position(self.x, self.z)
    }

    pub fn is_invincible(&self, clock: f32, duration: f32) -> bool {
        matches!(self.invincible_since, Some(since) if clock - since < duration)
    }

    /// Blast reach of bombs this character plants.
    pub fn bomb_range(&self, caps: &StatCaps) -> u32 {
        1 + self.add_stats.capped_bomb_range(caps).max(0) as u32
    }

    /// How many of this character's bombs may be armed at once.
    pub fn bomb_limit(&self, caps: &StatCaps) -> usize {
        1 + self.add_stats.capped_bomb_amount(caps).max(0) as usize
    }

    /// Movement speed in cells per second.
    pub fn move_speed(&self, tuning: &CharacterTuning) -> f32 {
        let total = tuning.min_move_speed
            + self.add_stats.capped_move_speed(&tuning.caps) * tuning.add_move_speed_per_power_up;
        total.max(0) as f32 * tuning.move_speed_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kick {
    pub direction: Direction,
    pub kicker_id: PlayerId,
    /// Fraction of a cell travelled toward the next cell.
    pub progress: f32,
}

#[derive(Debug, Clone)]
pub struct Bomb {
    pub id: BombId,
    /// `None` once the planter has left the arena.
    pub owner_id: Option<PlayerId>,
    pub cell: Cell,
    /// Cells reached in each direction.
    pub range: u32,
    /// Seconds until the bomb explodes on its own.
    pub fuse: f32,
    pub explode_through_bricks: bool,
    pub kick: Option<Kick>,
    /// Characters standing on the bomb when it was planted; they may walk off it.
    pub pass_through: Vec<PlayerId>,
    exploded: bool,
}

impl Bomb {
    pub(crate) fn new(id: BombId, owner_id: Option<PlayerId>, cell: Cell, range: u32, fuse: f32) -> Self {
        Self {
            id,
            owner_id,
            cell,
            range,
            fuse,
            explode_through_bricks: false,
            kick: None,
            pass_through: Vec::new(),
            exploded: false,
        }
    }

    pub fn exploded(&self) -> bool {
        self.exploded
    }

    /// Flips the exploded flag; returns false if it was already set.
    pub(crate) fn mark_exploded(&mut self) -> bool {
        if self.exploded {
            return false;
        }
        self.exploded = true;
        self.kick = None;
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Brick {
    pub cell: Cell,
    pub is_dead: bool,
    pub death_time: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PowerUp {
    pub id: PowerUpId,
    pub kind: PowerUpKind,
    pub cell: Cell,
}

/// Anything a blast can find on a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Wall,
    Brick { alive: bool },
    Character(PlayerId),
    PowerUp(PowerUpId),
    Bomb(BombId),
}

#[derive(Debug, Clone)]
pub struct CharacterSnapshot {
    pub id: PlayerId,
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

#[derive(Debug, Clone)]
pub struct BombSnapshot {
    pub id: BombId,
    pub owner_id: Option<PlayerId>,
    pub cell: Cell,
    pub range: u32,
    pub fuse: f32,
    pub sliding: bool,
}

#[derive(Debug, Clone)]
pub struct PowerUpSnapshot {
    pub id: PowerUpId,
    pub kind: PowerUpKind,
    pub cell: Cell,
}

#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    pub characters: Vec<CharacterSnapshot>,
    pub bombs: Vec<BombSnapshot>,
    pub destroyed_bricks: Vec<Cell>,
    pub power_ups: Vec<PowerUpSnapshot>,
}

impl From<&Bomb> for BombSnapshot {
    fn from(b: &Bomb) -> Self {
        Self {
            id: b.id,
            owner_id: b.owner_id,
            cell: b.cell,
            range: b.range,
            fuse: b.fuse.max(0.0),
            sliding: b.kick.is_some(),
        }
    }
}

impl From<&PowerUp> for PowerUpSnapshot {
    fn from(p: &PowerUp) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            cell: p.cell,
        }
    }
}
