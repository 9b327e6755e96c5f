use crate::domain::events::WorldEvent;
use crate::domain::grid::{Cell, Direction};
use crate::domain::state::{BombId, Kick, PlayerId};
use crate::domain::world::World;
use tracing::debug;

/// Result of probing the cell a character wants to step into.
enum Step {
    Free,
    Solid,
    Bomb(BombId),
}

impl World {
    pub(crate) fn move_characters(&mut self, dt: f32) {
        let movers: Vec<(PlayerId, f32, f32, f32)> = self
            .characters
            .values()
            .filter(|c| !c.is_dead)
            .filter_map(|c| {
                let (mut mx, mut mz) = (c.last_input.move_x, c.last_input.move_z);
                if !mx.is_finite() || !mz.is_finite() {
                    return None;
                }
                let len = (mx * mx + mz * mz).sqrt();
                if len < f32::EPSILON {
                    return None;
                }
                if len > 1.0 {
                    mx /= len;
                    mz /= len;
                }
                Some((c.id, mx, mz, c.move_speed(&self.tuning.character)))
            })
            .collect();

        for (player_id, mx, mz, speed) in movers {
            self.move_axis(player_id, mx * speed * dt, 0.0);
            self.move_axis(player_id, 0.0, mz * speed * dt);
        }

        self.release_pass_through();
    }

    /// Moves along a single axis, rejecting the step when it enters a blocked cell.
    fn move_axis(&mut self, player_id: PlayerId, dx: f32, dz: f32) {
        if dx == 0.0 && dz == 0.0 {
            return;
        }
        let Some(c) = self.characters.get(&player_id) else {
            return;
        };
        let from = c.cell();
        let (nx, nz) = (c.x + dx, c.z + dz);
        let to = Cell::from_position(nx, nz);
        let can_kick = c.add_stats.can_kick_bomb;

        if to != from {
            match self.probe(player_id, to) {
                Step::Free => {}
                Step::Solid => return,
                Step::Bomb(bomb_id) => {
                    if can_kick {
                        self.kick_bomb(bomb_id, player_id, Direction::of_step(dx, dz));
                    }
                    return;
                }
            }
        }

        if let Some(c) = self.characters.get_mut(&player_id) {
            c.x = nx;
            c.z = nz;
        }
    }

    fn probe(&self, player_id: PlayerId, cell: Cell) -> Step {
        if self.is_solid(cell) {
            return Step::Solid;
        }
        match self.bomb_at(cell) {
            Some(bomb) if !bomb.pass_through.contains(&player_id) => Step::Bomb(bomb.id),
            _ => Step::Free,
        }
    }

    fn kick_bomb(&mut self, bomb_id: BombId, kicker_id: PlayerId, direction: Direction) {
        let Some(bomb) = self.bombs.get_mut(&bomb_id) else {
            return;
        };
        if bomb.exploded() || bomb.kick.is_some() {
            return;
        }
        bomb.kick = Some(Kick {
            direction,
            kicker_id,
            progress: 0.0,
        });
        debug!(bomb_id, kicker_id, ?direction, "bomb kicked");
        self.events.push(WorldEvent::BombKicked {
            bomb_id,
            kicker_id,
            direction,
        });
    }

    /// Characters that walked off a fresh bomb collide with it from now on.
    fn release_pass_through(&mut self) {
        let characters = &self.characters;
        for bomb in self.bombs.values_mut() {
            let cell = bomb.cell;
            bomb.pass_through.retain(|id| {
                characters
                    .get(id)
                    .is_some_and(|c| !c.is_dead && c.cell() == cell)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::grid::{ArenaLayout, Cell, Direction};
    use crate::domain::rules::MatchRules;
    use crate::domain::state::PlayerInput;
    use crate::domain::stats::CharacterStats;
    use crate::domain::tuning::GameplayTuning;
    use crate::domain::world::World;
    use std::sync::Arc;

    fn kicker(world: &mut World, player_id: u64) {
        world.join(player_id, "ada");
        world.grant_stats(
            player_id,
            CharacterStats {
                can_kick_bomb: true,
                ..CharacterStats::default()
            },
        );
    }

    fn corridor() -> World {
        let layout = ArenaLayout::parse(&["S....#.", "......."]).expect("layout");
        World::new(Arc::new(layout), GameplayTuning::default(), MatchRules::default(), 3)
    }

    fn walk(world: &mut World, player_id: u64, move_x: f32, ticks: usize) {
        walk_toward(world, player_id, (move_x, 0.0), ticks);
    }

    fn walk_toward(world: &mut World, player_id: u64, (move_x, move_z): (f32, f32), ticks: usize) {
        world.set_input(
            player_id,
            PlayerInput {
                move_x,
                move_z,
                plant_bomb: false,
            },
        );
        for _ in 0..ticks {
            world.tick(1.0 / 60.0);
        }
    }

    #[test]
    fn walls_stop_movement() {
        let mut world = corridor();
        world.join(1, "ada");
        walk(&mut world, 1, 1.0, 300);
        assert_eq!(world.character(1).unwrap().cell(), Cell::new(4, 0));
    }

    #[test]
    fn planter_walks_off_then_collides() {
        let mut world = corridor();
        world.join(1, "ada");
        world.teleport(1, Cell::new(1, 0));
        let bomb = world.plant_bomb(1).unwrap();
        walk(&mut world, 1, 1.0, 24);
        assert_eq!(world.character(1).unwrap().cell(), Cell::new(2, 0));
        assert!(world.bomb(bomb).unwrap().pass_through.is_empty());

        walk(&mut world, 1, -1.0, 30);
        assert_eq!(world.character(1).unwrap().cell(), Cell::new(2, 0));
    }

    #[test]
    fn kicker_sends_bomb_sliding_until_blocked() {
        let mut world = corridor();
        kicker(&mut world, 1);
        let bomb = world.place_bomb(None, Cell::new(1, 0), 1).unwrap();
        walk(&mut world, 1, 1.0, 12);
        world.set_input(1, PlayerInput::default());
        assert!(world.bomb(bomb).unwrap().kick.is_some());

        for _ in 0..70 {
            world.tick(1.0 / 60.0);
        }
        let bomb = world.bomb(bomb).unwrap();
        assert_eq!(bomb.cell, Cell::new(4, 0));
        assert!(bomb.kick.is_none());
    }

    #[test]
    fn kick_along_z_slides_the_bomb_forward() {
        let layout = ArenaLayout::parse(&[
            "S......", //
            ".......",
            ".......",
            ".......",
            ".......",
            ".......",
        ])
        .expect("layout");
        let mut world =
            World::new(Arc::new(layout), GameplayTuning::default(), MatchRules::default(), 3);
        kicker(&mut world, 1);
        world.teleport(1, Cell::new(3, 1));
        let bomb = world.place_bomb(None, Cell::new(3, 2), 1).unwrap();

        walk_toward(&mut world, 1, (0.0, 1.0), 12);
        world.set_input(1, PlayerInput::default());
        let kick = world.bomb(bomb).unwrap().kick.expect("bomb was kicked");
        assert_eq!(kick.direction, Direction::Forward);

        for _ in 0..60 {
            world.tick(1.0 / 60.0);
        }
        let bomb = world.bomb(bomb).unwrap();
        assert_eq!(bomb.cell, Cell::new(3, 5));
        assert!(bomb.kick.is_none());
        assert_eq!(world.character(1).unwrap().cell(), Cell::new(3, 1));
    }

    #[test]
    fn kicked_bomb_stops_in_front_of_another_character() {
        let mut world = corridor();
        kicker(&mut world, 1);
        world.join(2, "bob");
        world.teleport(2, Cell::new(4, 0));
        let bomb = world.place_bomb(None, Cell::new(1, 0), 1).unwrap();

        walk(&mut world, 1, 1.0, 12);
        world.set_input(1, PlayerInput::default());
        assert!(world.bomb(bomb).unwrap().kick.is_some());

        for _ in 0..60 {
            world.tick(1.0 / 60.0);
        }
        let bomb = world.bomb(bomb).unwrap();
        assert_eq!(bomb.cell, Cell::new(3, 0));
        assert!(bomb.kick.is_none());
    }
}
