use crate::domain::grid::Cell;
use crate::domain::state::{BombId, PlayerId};
use crate::domain::world::World;

impl World {
    /// Burns every armed fuse and detonates the ones that ran out, lowest id first.
    pub(crate) fn burn_fuses(&mut self, dt: f32) {
        let mut due = Vec::new();
        for bomb in self.bombs.values_mut().filter(|b| !b.exploded()) {
            bomb.fuse -= dt;
            if bomb.fuse <= 0.0 {
                due.push(bomb.id);
            }
        }
        for bomb_id in due {
            // Already-chained bombs are skipped by the exploded flag.
            self.detonate(bomb_id);
        }
    }

    pub(crate) fn remove_exploded_bombs(&mut self) {
        let bomb_cells = &mut self.bomb_cells;
        self.bombs.retain(|id, bomb| {
            if bomb.exploded() {
                if bomb_cells.get(&bomb.cell) == Some(id) {
                    bomb_cells.remove(&bomb.cell);
                }
                false
            } else {
                true
            }
        });
    }

    /// Advances kicked bombs, at most one cell per tick, until something stops them.
    pub(crate) fn slide_kicked_bombs(&mut self, dt: f32) {
        let sliding: Vec<BombId> = self
            .bombs
            .values()
            .filter(|b| b.kick.is_some() && !b.exploded())
            .map(|b| b.id)
            .collect();

        for bomb_id in sliding {
            self.slide_bomb(bomb_id, self.tuning.bomb.kick_move_speed * dt);
        }
    }

    fn slide_bomb(&mut self, bomb_id: BombId, distance: f32) {
        let Some(bomb) = self.bombs.get_mut(&bomb_id) else {
            return;
        };
        let from = bomb.cell;
        let Some(kick) = bomb.kick.as_mut() else {
            return;
        };
        kick.progress += distance;
        if kick.progress < 1.0 {
            return;
        }
        let (direction, kicker_id) = (kick.direction, kick.kicker_id);

        let next = from.step(direction, 1);
        if self.stops_slide(next, kicker_id) {
            if let Some(bomb) = self.bombs.get_mut(&bomb_id) {
                bomb.kick = None;
            }
            return;
        }

        self.bomb_cells.remove(&from);
        self.bomb_cells.insert(next, bomb_id);
        if let Some(bomb) = self.bombs.get_mut(&bomb_id) {
            bomb.cell = next;
            if let Some(kick) = bomb.kick.as_mut() {
                kick.progress = (kick.progress - 1.0).min(0.99);
            }
        }
    }

    fn stops_slide(&self, cell: Cell, kicker_id: PlayerId) -> bool {
        self.is_solid(cell)
            || self.bomb_cells.contains_key(&cell)
            || self
                .characters
                .values()
                .any(|c| !c.is_dead && c.id != kicker_id && c.cell() == cell)
    }
}
