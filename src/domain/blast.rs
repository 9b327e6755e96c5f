// Blast propagation: cross-shaped sweeps with synchronous chain reactions.

use crate::domain::events::WorldEvent;
use crate::domain::grid::{Cell, Direction};
use crate::domain::state::{BombId, Occupant, PlayerId};
use crate::domain::world::World;
use tracing::debug;

/// One cell reached by a blast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlastTile {
    pub cell: Cell,
    /// `None` for the bomb's own cell.
    pub direction: Option<Direction>,
    pub distance: u32,
    /// The sweep stopped on this tile (an alive brick absorbed it).
    pub blocked: bool,
}

/// Everything one bomb's explosion reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blast {
    pub bomb_id: BombId,
    pub owner_id: Option<PlayerId>,
    pub center: Cell,
    pub tiles: Vec<BlastTile>,
}

impl Blast {
    pub fn covers(&self, cell: Cell) -> bool {
        self.tiles.iter().any(|t| t.cell == cell)
    }

    pub fn tiles_toward(&self, direction: Direction) -> impl Iterator<Item = &BlastTile> {
        self.tiles
            .iter()
            .filter(move |t| t.direction == Some(direction))
    }
}

enum TileOutcome {
    Wall,
    Blocked,
    Open,
}

#[derive(Clone, Copy)]
struct Source {
    bomb_id: BombId,
    owner_id: Option<PlayerId>,
    through_bricks: bool,
}

impl World {
    /// Explodes a bomb and everything it chains into.
    ///
    /// Blasts are returned in completion order: a chained bomb finishes before the bomb that
    /// triggered it. Detonating an unknown or already-exploded bomb returns nothing.
    pub fn detonate(&mut self, bomb_id: BombId) -> Vec<Blast> {
        let mut blasts = Vec::new();
        self.detonate_into(bomb_id, &mut blasts);
        blasts
    }

    fn detonate_into(&mut self, bomb_id: BombId, blasts: &mut Vec<Blast>) {
        let Some(bomb) = self.bombs.get_mut(&bomb_id) else {
            return;
        };
        // The exploded flag is what breaks cycles between mutually reachable bombs.
        if !bomb.mark_exploded() {
            return;
        }
        let (center, range) = (bomb.cell, bomb.range as i32);
        let source = Source {
            bomb_id,
            owner_id: bomb.owner_id,
            through_bricks: bomb.explode_through_bricks,
        };

        let mut tiles = vec![BlastTile {
            cell: center,
            direction: None,
            distance: 0,
            blocked: false,
        }];
        self.blast_tile(center, source, blasts);

        for direction in Direction::ALL {
            for i in 1..=range {
                let cell = center.step(direction, i);
                let outcome = self.blast_tile(cell, source, blasts);
                let blocked = match outcome {
                    TileOutcome::Wall => break,
                    TileOutcome::Blocked => true,
                    TileOutcome::Open => false,
                };
                tiles.push(BlastTile {
                    cell,
                    direction: Some(direction),
                    distance: i as u32,
                    blocked,
                });
                if blocked {
                    break;
                }
            }
        }

        if let Some(owner) = source
            .owner_id
            .and_then(|id| self.characters.get_mut(&id))
        {
            owner.active_bombs.retain(|id| *id != bomb_id);
        }

        debug!(
            bomb_id,
            center = %center,
            tiles = tiles.len(),
            "bomb exploded"
        );

        let blast = Blast {
            bomb_id,
            owner_id: source.owner_id,
            center,
            tiles,
        };
        self.events.push(WorldEvent::BombExploded(blast.clone()));
        blasts.push(blast);
    }

    /// Cells a bomb of `range` at `center` would reach right now, without side effects.
    pub fn blast_preview(&self, center: Cell, range: u32) -> Vec<Cell> {
        let through_bricks = self.tuning.bomb.explode_through_bricks;
        let mut cells = vec![center];
        for direction in Direction::ALL {
            for i in 1..=range as i32 {
                let cell = center.step(direction, i);
                if self.layout.is_wall(cell) {
                    break;
                }
                cells.push(cell);
                if !through_bricks && self.bricks.get(&cell).is_some_and(|b| !b.is_dead) {
                    break;
                }
            }
        }
        cells
    }

    fn blast_tile(&mut self, cell: Cell, source: Source, blasts: &mut Vec<Blast>) -> TileOutcome {
        let occupants = self.occupants_at(cell);
        if occupants.contains(&Occupant::Wall) {
            return TileOutcome::Wall;
        }

        let mut blocked = false;
        // Occupants come back power-ups first, so a brick's fresh drop survives this blast.
        for occupant in occupants {
            match occupant {
                Occupant::Wall => {}
                Occupant::PowerUp(_) => self.destroy_power_up(cell),
                Occupant::Brick { alive } => {
                    if alive && !source.through_bricks {
                        blocked = true;
                    }
                    self.damage_brick(cell);
                }
                Occupant::Character(player_id) => {
                    self.receive_damage(player_id, source.owner_id);
                }
                Occupant::Bomb(other) => {
                    if other != source.bomb_id {
                        self.detonate_into(other, blasts);
                    }
                }
            }
        }

        if blocked {
            TileOutcome::Blocked
        } else {
            TileOutcome::Open
        }
    }
}
