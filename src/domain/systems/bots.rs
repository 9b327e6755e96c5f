// Server-driven opponents: roam, plant, flee, wait, repeat.

use crate::domain::grid::{Cell, Direction};
use crate::domain::state::{BombId, PlayerId, PlayerInput};
use crate::domain::world::World;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A waypoint counts as reached within this distance of its cell center.
const WAYPOINT_TOLERANCE: f32 = 0.1;

/// Seconds without progress before a bot drops its route.
const STUCK_SECONDS: f32 = 0.5;

/// Upper bound on cells an escape search visits.
const ESCAPE_SEARCH_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BotPhase {
    #[default]
    Idle,
    Roaming,
    /// Running from the bomb it just planted.
    Fleeing(BombId),
    Waiting(BombId),
}

#[derive(Debug, Default)]
pub struct BotBrain {
    pub phase: BotPhase,
    pub waypoints: VecDeque<Cell>,
    last_position: Option<(f32, f32)>,
    stuck_for: f32,
}

impl World {
    pub(crate) fn think_bots(&mut self, dt: f32) {
        let humans_present = self.human_count() > 0;
        let bot_ids: Vec<PlayerId> = self
            .characters
            .values()
            .filter(|c| c.brain.is_some())
            .map(|c| c.id)
            .collect();

        for bot_id in bot_ids {
            let Some(mut brain) = self
                .characters
                .get_mut(&bot_id)
                .and_then(|c| c.brain.take())
            else {
                continue;
            };

            let input = if humans_present {
                self.think_bot(bot_id, &mut brain, dt)
            } else {
                brain = BotBrain::default();
                PlayerInput::default()
            };

            if let Some(c) = self.characters.get_mut(&bot_id) {
                c.brain = Some(brain);
                c.last_input = input;
            }
        }
    }

    fn think_bot(&mut self, bot_id: PlayerId, brain: &mut BotBrain, dt: f32) -> PlayerInput {
        let caps = self.tuning.character.caps;
        let Some(c) = self.characters.get(&bot_id) else {
            return PlayerInput::default();
        };

        if c.is_dead {
            *brain = BotBrain::default();
            if self.respawn(bot_id).is_ok() {
                debug!(bot_id, "bot respawned");
            }
            return PlayerInput::default();
        }

        let cell = c.cell();
        let position = (c.x, c.z);
        let range = c.bomb_range(&caps);
        let can_plant = c.active_bombs.len() < c.bomb_limit(&caps);

        if brain.track_progress(position, dt) {
            brain.waypoints.clear();
        }

        match brain.phase {
            BotPhase::Idle => {
                brain.waypoints = self.plan_roam(bot_id, cell, range);
                brain.phase = BotPhase::Roaming;
            }
            BotPhase::Roaming if brain.waypoints.is_empty() => {
                let planted = if can_plant {
                    self.plant_bomb(bot_id).ok()
                } else {
                    None
                };
                match planted {
                    Some(bomb_id) => {
                        brain.waypoints = self.plan_escape(cell);
                        brain.phase = BotPhase::Fleeing(bomb_id);
                    }
                    None => brain.phase = BotPhase::Idle,
                }
            }
            BotPhase::Fleeing(bomb_id) if brain.waypoints.is_empty() => {
                brain.phase = BotPhase::Waiting(bomb_id);
            }
            BotPhase::Waiting(bomb_id) => {
                if self.bombs.get(&bomb_id).is_none_or(|b| b.exploded()) {
                    brain.phase = BotPhase::Idle;
                }
            }
            _ => {}
        }

        brain.steer(position)
    }

    /// A random walk that never doubles back, cut short once something worth blowing up is in line.
    pub(crate) fn plan_roam(&mut self, bot_id: PlayerId, start: Cell, range: u32) -> VecDeque<Cell> {
        let max_steps = self.tuning.bots.max_route_steps;
        let min_steps = self.tuning.bots.min_route_steps;

        let mut route = VecDeque::new();
        let mut cell = start;
        let mut heading: Option<Direction> = None;

        while route.len() < max_steps {
            let open: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|&d| heading != Some(d.opposite()))
                .filter(|&d| self.is_walkable(cell.step(d, 1)))
                .collect();
            let Some(&direction) = open.choose(&mut self.rng) else {
                break;
            };

            cell = cell.step(direction, 1);
            heading = Some(direction);
            route.push_back(cell);

            if route.len() > min_steps && self.target_in_line(bot_id, cell, range) {
                break;
            }
        }
        route
    }

    /// Shortest walk from `start` to a cell no armed bomb can reach.
    pub(crate) fn plan_escape(&self, start: Cell) -> VecDeque<Cell> {
        let danger = self.danger_cells();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut seen: HashSet<Cell> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            if !danger.contains(&cell) {
                let mut route = VecDeque::new();
                let mut at = cell;
                while at != start {
                    route.push_front(at);
                    at = came_from[&at];
                }
                return route;
            }
            if seen.len() > ESCAPE_SEARCH_LIMIT {
                break;
            }
            for direction in Direction::ALL {
                let next = cell.step(direction, 1);
                if self.is_walkable(next) && seen.insert(next) {
                    came_from.insert(next, cell);
                    queue.push_back(next);
                }
            }
        }
        VecDeque::new()
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        !self.is_solid(cell) && !self.bomb_cells.contains_key(&cell)
    }

    fn danger_cells(&self) -> HashSet<Cell> {
        self.bombs
            .values()
            .filter(|b| !b.exploded())
            .flat_map(|b| self.blast_preview(b.cell, b.range))
            .collect()
    }

    fn target_in_line(&self, bot_id: PlayerId, cell: Cell, range: u32) -> bool {
        self.blast_preview(cell, range).into_iter().any(|t| {
            self.bricks.get(&t).is_some_and(|b| !b.is_dead)
                || self
                    .characters
                    .values()
                    .any(|c| c.id != bot_id && !c.is_dead && c.cell() == t)
        })
    }
}

impl BotBrain {
    /// Returns true once the bot has been pinned in place for too long.
    fn track_progress(&mut self, position: (f32, f32), dt: f32) -> bool {
        let moved = self.last_position.is_none_or(|(x, z)| {
            (x - position.0).abs() > f32::EPSILON || (z - position.1).abs() > f32::EPSILON
        });
        self.last_position = Some(position);

        if moved || self.waypoints.is_empty() {
            self.stuck_for = 0.0;
            return false;
        }
        self.stuck_for += dt;
        if self.stuck_for >= STUCK_SECONDS {
            self.stuck_for = 0.0;
            return true;
        }
        false
    }

    fn steer(&mut self, position: (f32, f32)) -> PlayerInput {
        while let Some(next) = self.waypoints.front() {
            let (tx, tz) = next.center();
            let (dx, dz) = (tx - position.0, tz - position.1);
            let distance = (dx * dx + dz * dz).sqrt();
            if distance <= WAYPOINT_TOLERANCE {
                self.waypoints.pop_front();
                continue;
            }
            return PlayerInput {
                move_x: dx / distance,
                move_z: dz / distance,
                plant_bomb: false,
            };
        }
        PlayerInput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::WorldEvent;
    use crate::domain::grid::ArenaLayout;
    use crate::domain::rules::MatchRules;
    use crate::domain::tuning::GameplayTuning;
    use std::sync::Arc;

    const OPEN: &[&str] = &[
        "S......", //
        ".......",
        ".......",
        "...S...",
        ".......",
        ".......",
        "......S",
    ];

    fn world() -> World {
        let layout = ArenaLayout::parse(OPEN).expect("layout");
        World::new(Arc::new(layout), GameplayTuning::default(), MatchRules::default(), 21)
    }

    fn is_adjacent(a: Cell, b: Cell) -> bool {
        (a.x - b.x).abs() + (a.z - b.z).abs() == 1
    }

    #[test]
    fn bots_idle_without_humans() {
        let mut world = world();
        world.add_bot(100, "bot");
        let start = world.character(100).unwrap().cell();
        for _ in 0..300 {
            let events = world.tick(1.0 / 60.0);
            assert!(
                !events
                    .iter()
                    .any(|e| matches!(e, WorldEvent::BombPlanted { .. }))
            );
        }
        assert_eq!(world.character(100).unwrap().cell(), start);
    }

    #[test]
    fn bot_plants_once_a_human_joins() {
        let mut world = world();
        world.add_bot(100, "bot");
        world.join(1, "ada");
        let mut planted = false;
        for _ in 0..600 {
            planted |= world.tick(1.0 / 60.0).iter().any(|e| {
                matches!(e, WorldEvent::BombPlanted { owner_id: Some(100), .. })
            });
        }
        assert!(planted);
    }

    #[test]
    fn dead_bot_respawns_when_allowed() {
        let mut world = world();
        world.add_bot(100, "bot");
        world.join(1, "ada");
        world.clock += 10.0;
        world.receive_damage(100, Some(1));
        world.tick(1.0);
        assert!(world.character(100).unwrap().is_dead);
        world.tick(4.5);
        assert!(!world.character(100).unwrap().is_dead);
    }

    #[test]
    fn roam_route_never_doubles_back() {
        let mut world = world();
        for _ in 0..20 {
            let start = Cell::new(3, 3);
            let route = world.plan_roam(100, start, 1);
            assert!(!route.is_empty());
            assert!(route.len() <= 10);
            let cells: Vec<Cell> = std::iter::once(start).chain(route).collect();
            for pair in cells.windows(2) {
                assert!(is_adjacent(pair[0], pair[1]));
            }
            for triple in cells.windows(3) {
                assert_ne!(triple[0], triple[2]);
            }
        }
    }

    #[test]
    fn escape_route_leaves_the_blast_line() {
        let mut world = world();
        let center = Cell::new(3, 3);
        world.place_bomb(None, center, 2).unwrap();
        let route = world.plan_escape(center);

        let last = *route.back().expect("escape exists");
        assert!(!world.blast_preview(center, 2).contains(&last));
        assert_eq!(route.len(), 2);
        assert!(is_adjacent(center, route[0]));
        assert!(is_adjacent(route[0], route[1]));
    }
}
