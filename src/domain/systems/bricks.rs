use crate::domain::events::WorldEvent;
use crate::domain::grid::Cell;
use crate::domain::state::PlayerId;
use crate::domain::world::World;
use tracing::debug;

impl World {
    /// Restores dead bricks whose timer ran out, as long as nobody is nearby.
    pub(crate) fn restore_bricks(&mut self) {
        let tuning = self.tuning.brick;
        let clock = self.clock;
        let mut due: Vec<Cell> = self
            .bricks
            .values()
            .filter(|b| b.is_dead && clock - b.death_time >= tuning.respawn_seconds)
            .map(|b| b.cell)
            .filter(|&cell| self.brick_area_clear(cell, tuning.respawn_clear_radius))
            .collect();
        due.sort();

        for cell in due {
            if let Some(brick) = self.bricks.get_mut(&cell) {
                brick.is_dead = false;
            }
            self.destroy_power_up(cell);
            debug!(cell = %cell, "brick restored");
            self.events.push(WorldEvent::BrickRestored { cell });
        }
    }

    fn brick_area_clear(&self, cell: Cell, radius: f32) -> bool {
        let character_near = self.characters.values().any(|c| {
            !c.is_dead && {
                let (dx, dz) = (c.x - cell.x as f32, c.z - cell.z as f32);
                (dx * dx + dz * dz).sqrt() <= radius
            }
        });
        let bomb_near = self
            .bombs
            .values()
            .any(|b| !b.exploded() && b.cell.distance(cell) <= radius);
        !character_near && !bomb_near
    }

    /// Alive characters standing on a power-up pick it up.
    pub(crate) fn collect_power_ups(&mut self) {
        let pickups: Vec<(PlayerId, Cell)> = self
            .characters
            .values()
            .filter(|c| !c.is_dead)
            .map(|c| (c.id, c.cell()))
            .filter(|(_, cell)| self.power_ups.contains_key(cell))
            .collect();

        for (player_id, cell) in pickups {
            // Two characters on one cell: the lower id already took it.
            let Some(power_up) = self.power_ups.remove(&cell) else {
                continue;
            };
            if let Some(c) = self.characters.get_mut(&player_id) {
                c.add_stats += power_up.kind.stats();
            }
            debug!(player_id, kind = ?power_up.kind, "power-up collected");
            self.events.push(WorldEvent::PowerUpCollected {
                player_id,
                power_up_id: power_up.id,
                kind: power_up.kind,
                cell,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::events::WorldEvent;
    use crate::domain::grid::{ArenaLayout, Cell};
    use crate::domain::power_ups::PowerUpKind;
    use crate::domain::rules::MatchRules;
    use crate::domain::tuning::GameplayTuning;
    use crate::domain::world::World;
    use std::sync::Arc;

    const LONG_HALL: &[&str] = &["S..........+", "............"];

    fn world() -> World {
        let layout = ArenaLayout::parse(LONG_HALL).expect("layout");
        let mut tuning = GameplayTuning::default();
        tuning.power_ups.drops.clear();
        World::new(Arc::new(layout), tuning, MatchRules::default(), 11)
    }

    #[test]
    fn brick_respawns_after_delay_when_clear() {
        let mut world = world();
        let brick = Cell::new(11, 0);
        world.damage_brick(brick);
        world.spawn_power_up(brick, PowerUpKind::Heart);
        world.tick(29.0);
        assert!(world.brick_at(brick).unwrap().is_dead);

        let events = world.tick(1.5);
        assert!(!world.brick_at(brick).unwrap().is_dead);
        assert!(world.power_up_at(brick).is_none());
        assert!(events.contains(&WorldEvent::BrickRestored { cell: brick }));
    }

    #[test]
    fn nearby_character_delays_brick_respawn() {
        let mut world = world();
        let brick = Cell::new(11, 0);
        world.damage_brick(brick);
        world.join(1, "ada");
        world.teleport(1, Cell::new(8, 1));
        world.tick(31.0);
        assert!(world.brick_at(brick).unwrap().is_dead);

        world.teleport(1, Cell::new(0, 0));
        world.tick(0.1);
        assert!(!world.brick_at(brick).unwrap().is_dead);
    }

    #[test]
    fn walking_onto_power_up_collects_it() {
        let mut world = world();
        world.join(1, "ada");
        world.spawn_power_up(Cell::new(0, 0), PowerUpKind::BombRange);
        world.tick(1.0 / 60.0);
        assert!(world.power_up_at(Cell::new(0, 0)).is_none());
        assert_eq!(world.character(1).unwrap().add_stats.bomb_range, 1);
    }
}
