// Authoritative arena state: an occupancy map keyed by integer cells.

use crate::domain::events::WorldEvent;
use crate::domain::grid::{ArenaLayout, Cell};
use crate::domain::power_ups::{PowerUpKind, roll_drop};
use crate::domain::rules::{MatchRules, RankEntry, rank_entries};
use crate::domain::state::{
    Bomb, BombId, BombSnapshot, Brick, Character, CharacterSnapshot, Occupant, PlayerId,
    PlayerInput, PowerUp, PowerUpId, PowerUpSnapshot, WorldSnapshot,
};
use crate::domain::systems::bots::BotBrain;
use crate::domain::tuning::GameplayTuning;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Reasons a bomb could not be planted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantError {
    UnknownPlayer,
    Dead,
    MatchEnded,
    BombLimit,
    /// Another bomb already sits on the cell.
    Occupied,
    /// Wall or alive brick.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnError {
    UnknownPlayer,
    Alive,
    TooSoon,
    MatchEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    ShieldLost { hearts_left: i32 },
    Killed,
}

pub struct World {
    pub(crate) layout: Arc<ArenaLayout>,
    pub(crate) tuning: GameplayTuning,
    pub(crate) rules: MatchRules,
    pub(crate) rng: ChaCha8Rng,
    /// Seconds of simulated time since the match started.
    pub(crate) clock: f32,
    pub(crate) match_ended: bool,
    pub(crate) characters: BTreeMap<PlayerId, Character>,
    pub(crate) bombs: BTreeMap<BombId, Bomb>,
    pub(crate) bomb_cells: HashMap<Cell, BombId>,
    pub(crate) bricks: HashMap<Cell, Brick>,
    pub(crate) power_ups: HashMap<Cell, PowerUp>,
    next_bomb_id: BombId,
    next_power_up_id: PowerUpId,
    pub(crate) events: Vec<WorldEvent>,
}

impl World {
    pub fn new(
        layout: Arc<ArenaLayout>,
        tuning: GameplayTuning,
        rules: MatchRules,
        seed: u64,
    ) -> Self {
        let mut world = Self {
            layout,
            tuning,
            rules,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: 0.0,
            match_ended: false,
            characters: BTreeMap::new(),
            bombs: BTreeMap::new(),
            bomb_cells: HashMap::new(),
            bricks: HashMap::new(),
            power_ups: HashMap::new(),
            next_bomb_id: 1,
            next_power_up_id: 1,
            events: Vec::new(),
        };
        world.restore_layout_bricks();
        world
    }

    fn restore_layout_bricks(&mut self) {
        self.bricks = self
            .layout
            .bricks
            .iter()
            .map(|&cell| {
                (
                    cell,
                    Brick {
                        cell,
                        is_dead: false,
                        death_time: 0.0,
                    },
                )
            })
            .collect();
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    pub fn tuning(&self) -> &GameplayTuning {
        &self.tuning
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn is_match_ended(&self) -> bool {
        self.match_ended
    }

    /// Freezes the arena: no movement, planting, respawning, or damage to others.
    pub fn end_match(&mut self) {
        if self.match_ended {
            return;
        }
        self.match_ended = true;
        for c in self.characters.values_mut() {
            c.last_input = PlayerInput::default();
        }
        info!(clock = self.clock, "match ended");
    }

    /// Puts the arena back to its opening state, keeping who is connected.
    pub fn reset_match(&mut self) {
        self.clock = 0.0;
        self.match_ended = false;
        self.bombs.clear();
        self.bomb_cells.clear();
        self.power_ups.clear();
        self.restore_layout_bricks();

        let ids: Vec<PlayerId> = self.characters.keys().copied().collect();
        for id in ids {
            if let Some(c) = self.characters.get_mut(&id) {
                c.score = 0;
                c.kill_count = 0;
                c.die_count = 0;
                c.add_stats = c.base_stats;
                c.active_bombs.clear();
                if c.brain.is_some() {
                    c.brain = Some(BotBrain::default());
                }
            }
            self.spawn_character(id);
        }
    }

    pub fn character(&self, player_id: PlayerId) -> Option<&Character> {
        self.characters.get(&player_id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn human_count(&self) -> usize {
        self.characters.values().filter(|c| !c.is_bot).count()
    }

    pub fn bomb(&self, bomb_id: BombId) -> Option<&Bomb> {
        self.bombs.get(&bomb_id)
    }

    pub fn bomb_at(&self, cell: Cell) -> Option<&Bomb> {
        self.bomb_cells.get(&cell).and_then(|id| self.bombs.get(id))
    }

    pub fn brick_at(&self, cell: Cell) -> Option<&Brick> {
        self.bricks.get(&cell)
    }

    pub fn power_up_at(&self, cell: Cell) -> Option<&PowerUp> {
        self.power_ups.get(&cell)
    }

    /// Walls and alive bricks.
    pub fn is_solid(&self, cell: Cell) -> bool {
        self.layout.is_wall(cell) || self.bricks.get(&cell).is_some_and(|b| !b.is_dead)
    }

    /// Everything on a cell, power-ups ahead of bricks, characters ahead of bombs.
    pub fn occupants_at(&self, cell: Cell) -> Vec<Occupant> {
        let mut occupants = Vec::new();
        if self.layout.is_wall(cell) {
            occupants.push(Occupant::Wall);
        }
        if let Some(p) = self.power_ups.get(&cell) {
            occupants.push(Occupant::PowerUp(p.id));
        }
        if let Some(b) = self.bricks.get(&cell) {
            occupants.push(Occupant::Brick { alive: !b.is_dead });
        }
        occupants.extend(
            self.characters
                .values()
                .filter(|c| !c.is_dead && c.cell() == cell)
                .map(|c| Occupant::Character(c.id)),
        );
        if let Some(id) = self.bomb_cells.get(&cell) {
            occupants.push(Occupant::Bomb(*id));
        }
        occupants
    }

    /// Adds a player; they spawn right away unless the match has ended.
    ///
    /// Returns false if the id is already in the arena.
    pub fn join(&mut self, player_id: PlayerId, display_name: impl Into<String>) -> bool {
        if self.characters.contains_key(&player_id) {
            return false;
        }
        let mut character = Character::new(
            player_id,
            display_name.into(),
            self.tuning.character.base_stats,
        );
        character.death_time = self.clock;
        self.characters.insert(player_id, character);
        if !self.match_ended {
            self.spawn_character(player_id);
        }
        true
    }

    pub fn add_bot(&mut self, player_id: PlayerId, display_name: impl Into<String>) -> bool {
        if !self.join(player_id, display_name) {
            return false;
        }
        if let Some(c) = self.characters.get_mut(&player_id) {
            c.is_bot = true;
            c.brain = Some(BotBrain::default());
        }
        true
    }

    /// Removes a player. Their armed bombs stay but no longer credit anyone.
    pub fn leave(&mut self, player_id: PlayerId) -> bool {
        if self.characters.remove(&player_id).is_none() {
            return false;
        }
        for bomb in self.bombs.values_mut() {
            if bomb.owner_id == Some(player_id) {
                bomb.owner_id = None;
            }
            bomb.pass_through.retain(|id| *id != player_id);
        }
        true
    }

    pub fn set_input(&mut self, player_id: PlayerId, input: PlayerInput) {
        if let Some(c) = self.characters.get_mut(&player_id) {
            // Keep a pending plant request until the next tick consumes it.
            let plant_bomb = input.plant_bomb || c.last_input.plant_bomb;
            c.last_input = PlayerInput { plant_bomb, ..input };
        }
    }

    /// Moves a living character onto a cell center.
    pub fn teleport(&mut self, player_id: PlayerId, cell: Cell) -> bool {
        match self.characters.get_mut(&player_id) {
            Some(c) => {
                (c.x, c.z) = cell.center();
                true
            }
            None => false,
        }
    }

    /// Grants stats on top of what the character already has.
    pub fn grant_stats(&mut self, player_id: PlayerId, stats: crate::domain::stats::CharacterStats) {
        if let Some(c) = self.characters.get_mut(&player_id) {
            c.add_stats += stats;
        }
    }

    /// Places a fresh brick on an empty floor cell.
    pub fn spawn_brick(&mut self, cell: Cell) -> bool {
        if self.is_solid(cell) || self.bomb_cells.contains_key(&cell) {
            return false;
        }
        self.bricks.insert(
            cell,
            Brick {
                cell,
                is_dead: false,
                death_time: 0.0,
            },
        );
        true
    }

    pub fn spawn_power_up(&mut self, cell: Cell, kind: PowerUpKind) -> Option<PowerUpId> {
        if self.is_solid(cell) || self.power_ups.contains_key(&cell) {
            return None;
        }
        let id = self.next_power_up_id;
        self.next_power_up_id += 1;
        self.power_ups.insert(cell, PowerUp { id, kind, cell });
        self.events.push(WorldEvent::PowerUpSpawned {
            power_up_id: id,
            kind,
            cell,
        });
        Some(id)
    }

    pub(crate) fn destroy_power_up(&mut self, cell: Cell) {
        if let Some(p) = self.power_ups.remove(&cell) {
            self.events.push(WorldEvent::PowerUpDestroyed {
                power_up_id: p.id,
                cell,
            });
        }
    }

    /// Breaks an alive brick and rolls its drop. Dead bricks ignore damage.
    pub(crate) fn damage_brick(&mut self, cell: Cell) {
        let clock = self.clock;
        match self.bricks.get_mut(&cell) {
            Some(brick) if !brick.is_dead => {
                brick.is_dead = true;
                brick.death_time = clock;
            }
            _ => return,
        }
        self.events.push(WorldEvent::BrickDestroyed { cell });

        if let Some(kind) = roll_drop(&self.tuning.power_ups, &mut self.rng) {
            self.spawn_power_up(cell, kind);
        }
    }

    /// Plants a bomb on the character's cell.
    pub fn plant_bomb(&mut self, player_id: PlayerId) -> Result<BombId, PlantError> {
        let caps = self.tuning.character.caps;
        let Some(c) = self.characters.get(&player_id) else {
            return Err(PlantError::UnknownPlayer);
        };
        if c.is_dead {
            return Err(PlantError::Dead);
        }
        if self.match_ended {
            return Err(PlantError::MatchEnded);
        }
        if c.active_bombs.len() >= c.bomb_limit(&caps) {
            return Err(PlantError::BombLimit);
        }
        let cell = c.cell();
        let range = c.bomb_range(&caps);
        self.place_bomb(Some(player_id), cell, range)
    }

    /// Arms a bomb on a cell; the building block of planting.
    pub fn place_bomb(
        &mut self,
        owner_id: Option<PlayerId>,
        cell: Cell,
        range: u32,
    ) -> Result<BombId, PlantError> {
        if self.is_solid(cell) {
            return Err(PlantError::Blocked);
        }
        if self.bomb_cells.contains_key(&cell) {
            return Err(PlantError::Occupied);
        }

        let id = self.next_bomb_id;
        self.next_bomb_id += 1;

        let mut bomb = Bomb::new(id, owner_id, cell, range, self.tuning.bomb.life_time);
        bomb.explode_through_bricks = self.tuning.bomb.explode_through_bricks;
        bomb.pass_through = self
            .characters
            .values()
            .filter(|c| !c.is_dead && c.cell() == cell)
            .map(|c| c.id)
            .collect();

        self.bombs.insert(id, bomb);
        self.bomb_cells.insert(cell, id);
        if let Some(owner) = owner_id.and_then(|oid| self.characters.get_mut(&oid)) {
            owner.active_bombs.push(id);
        }
        self.events.push(WorldEvent::BombPlanted {
            bomb_id: id,
            owner_id,
            cell,
            range,
        });
        debug!(bomb_id = id, ?owner_id, cell = %cell, range, "bomb planted");
        Ok(id)
    }

    /// Applies one blast hit to a character.
    ///
    /// Hearts absorb the hit and grant invincibility; with no hearts left the hit is lethal.
    pub fn receive_damage(
        &mut self,
        victim_id: PlayerId,
        attacker_id: Option<PlayerId>,
    ) -> DamageOutcome {
        let clock = self.clock;
        let invincible_seconds = self.tuning.character.invincible_seconds;
        let self_inflicted = attacker_id == Some(victim_id);
        if self.match_ended && !self_inflicted {
            return DamageOutcome::Ignored;
        }

        let Some(victim) = self.characters.get_mut(&victim_id) else {
            return DamageOutcome::Ignored;
        };
        if victim.is_dead || victim.is_invincible(clock, invincible_seconds) {
            return DamageOutcome::Ignored;
        }

        if victim.add_stats.heart > 0 {
            victim.add_stats.heart -= 1;
            victim.invincible_since = Some(clock);
            let hearts_left = victim.add_stats.heart;
            self.events.push(WorldEvent::CharacterDamaged {
                player_id: victim_id,
                hearts_left,
            });
            return DamageOutcome::ShieldLost { hearts_left };
        }

        victim.is_dead = true;
        victim.death_time = clock;
        victim.die_count += 1;
        victim.invincible_since = None;
        victim.last_input = PlayerInput::default();
        self.credit_kill(attacker_id, victim_id);
        DamageOutcome::Killed
    }

    fn credit_kill(&mut self, killer_id: Option<PlayerId>, victim_id: PlayerId) {
        let mode = self.rules.mode;
        let suicide = killer_id == Some(victim_id);
        let kill_score = mode.kill_score(&self.tuning.score);
        let suicide_score = mode.suicide_score(&self.tuning.score);

        if let Some(killer) = killer_id.and_then(|id| self.characters.get_mut(&id)) {
            if suicide {
                killer.score += suicide_score;
            } else {
                killer.score += kill_score;
                killer.kill_count += 1;
            }
        }

        info!(?killer_id, victim_id, suicide, "player killed");
        self.events.push(WorldEvent::Kill {
            killer_id,
            victim_id,
            suicide,
        });
    }

    /// Brings a dead character back once the respawn delay has passed.
    pub fn respawn(&mut self, player_id: PlayerId) -> Result<(), RespawnError> {
        let respawn_seconds = self.tuning.character.respawn_seconds;
        let resets = self.rules.mode.resets_progress_on_respawn();
        let Some(c) = self.characters.get_mut(&player_id) else {
            return Err(RespawnError::UnknownPlayer);
        };
        if !c.is_dead {
            return Err(RespawnError::Alive);
        }
        if self.match_ended {
            return Err(RespawnError::MatchEnded);
        }
        if self.clock - c.death_time < respawn_seconds {
            return Err(RespawnError::TooSoon);
        }

        if resets {
            c.score = 0;
            c.kill_count = 0;
            c.add_stats = c.base_stats;
            c.active_bombs.clear();
        }
        self.spawn_character(player_id);
        Ok(())
    }

    pub(crate) fn spawn_character(&mut self, player_id: PlayerId) {
        let clock = self.clock;
        let Some(&cell) = self.layout.spawn_points.choose(&mut self.rng) else {
            return;
        };
        let Some(c) = self.characters.get_mut(&player_id) else {
            return;
        };
        (c.x, c.z) = cell.center();
        c.is_dead = false;
        c.invincible_since = Some(clock);
        c.last_input = PlayerInput::default();
        self.events.push(WorldEvent::CharacterSpawned { player_id, cell });
    }

    /// Advances the arena by `dt` seconds and drains the events it produced.
    pub fn tick(&mut self, dt: f32) -> Vec<WorldEvent> {
        self.clock += dt;

        if !self.match_ended {
            self.think_bots(dt);
            self.process_plant_requests();
            self.move_characters(dt);
            self.slide_kicked_bombs(dt);
            self.collect_power_ups();
        }
        self.burn_fuses(dt);
        self.remove_exploded_bombs();
        self.restore_bricks();

        std::mem::take(&mut self.events)
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn process_plant_requests(&mut self) {
        let requests: Vec<PlayerId> = self
            .characters
            .values_mut()
            .filter(|c| c.last_input.plant_bomb)
            .map(|c| {
                c.last_input.plant_bomb = false;
                c.id
            })
            .collect();

        for player_id in requests {
            if let Err(reason) = self.plant_bomb(player_id) {
                debug!(player_id, ?reason, "plant rejected");
            }
        }
    }

    pub fn top_kills(&self) -> u32 {
        self.characters
            .values()
            .map(|c| c.kill_count)
            .max()
            .unwrap_or(0)
    }

    pub fn rankings(&self) -> Vec<RankEntry> {
        rank_entries(
            self.characters
                .values()
                .map(|c| RankEntry {
                    rank: 0,
                    player_id: c.id,
                    display_name: c.display_name.clone(),
                    score: c.score,
                    kills: c.kill_count,
                    deaths: c.die_count,
                })
                .collect(),
        )
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let tuning = &self.tuning.character;
        let characters = self
            .characters
            .values()
            .map(|c| CharacterSnapshot {
                id: c.id,
                display_name: c.display_name.clone(),
                is_bot: c.is_bot,
                x: c.x,
                z: c.z,
                alive: !c.is_dead,
                invincible: c.is_invincible(self.clock, tuning.invincible_seconds),
                hearts: c.add_stats.capped_heart(&tuning.caps),
                bomb_range: c.bomb_range(&tuning.caps),
                bomb_limit: c.bomb_limit(&tuning.caps),
                move_speed: c.move_speed(tuning),
                can_kick: c.add_stats.can_kick_bomb,
                score: c.score,
                kills: c.kill_count,
                deaths: c.die_count,
            })
            .collect();

        let mut destroyed_bricks: Vec<Cell> = self
            .bricks
            .values()
            .filter(|b| b.is_dead)
            .map(|b| b.cell)
            .collect();
        destroyed_bricks.sort();

        let mut power_ups: Vec<PowerUpSnapshot> =
            self.power_ups.values().map(PowerUpSnapshot::from).collect();
        power_ups.sort_by_key(|p| p.id);

        WorldSnapshot {
            characters,
            bombs: self
                .bombs
                .values()
                .filter(|b| !b.exploded())
                .map(BombSnapshot::from)
                .collect(),
            destroyed_bricks,
            power_ups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::GameMode;
    use crate::domain::stats::CharacterStats;
    use std::time::Duration;

    const ARENA: &[&str] = &[
        "S......", //
        ".......",
        ".......",
        ".......",
        ".......",
    ];

    fn world_with(rules: MatchRules) -> World {
        let layout = ArenaLayout::parse(ARENA).expect("layout");
        let mut tuning = GameplayTuning::default();
        tuning.power_ups.drops.clear();
        World::new(Arc::new(layout), tuning, rules, 9)
    }

    fn world() -> World {
        world_with(MatchRules::default())
    }

    /// Skips past spawn invincibility.
    fn settle(world: &mut World) {
        world.clock += 10.0;
    }

    #[test]
    fn join_spawns_with_invincibility() {
        let mut world = world();
        assert!(world.join(1, "ada"));
        assert!(!world.join(1, "ada again"));
        let c = world.character(1).unwrap();
        assert!(!c.is_dead);
        assert_eq!(c.cell(), Cell::new(0, 0));
        assert!(c.is_invincible(world.clock, 1.5));
        assert_eq!(
            world.drain_events(),
            vec![WorldEvent::CharacterSpawned {
                player_id: 1,
                cell: Cell::new(0, 0)
            }]
        );
    }

    #[test]
    fn plant_respects_bomb_limit_and_occupied_cells() {
        let mut world = world();
        world.join(1, "ada");
        world.teleport(1, Cell::new(3, 2));
        let first = world.plant_bomb(1).unwrap();
        assert_eq!(world.plant_bomb(1), Err(PlantError::BombLimit));

        world.grant_stats(
            1,
            CharacterStats {
                bomb_amount: 1,
                ..CharacterStats::default()
            },
        );
        assert_eq!(world.plant_bomb(1), Err(PlantError::Occupied));
        world.teleport(1, Cell::new(4, 2));
        let second = world.plant_bomb(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(world.character(1).unwrap().active_bombs, vec![first, second]);
    }

    #[test]
    fn planted_bomb_range_follows_power_ups() {
        let mut world = world();
        world.join(1, "ada");
        world.grant_stats(
            1,
            CharacterStats {
                bomb_range: 2,
                ..CharacterStats::default()
            },
        );
        let bomb = world.plant_bomb(1).unwrap();
        assert_eq!(world.bomb(bomb).unwrap().range, 3);
        assert_eq!(world.bomb(bomb).unwrap().pass_through, vec![1]);
    }

    #[test]
    fn heart_absorbs_a_hit_then_invincibility_blocks_the_next() {
        let mut world = world();
        world.join(1, "ada");
        settle(&mut world);
        world.grant_stats(
            1,
            CharacterStats {
                heart: 1,
                ..CharacterStats::default()
            },
        );
        assert_eq!(
            world.receive_damage(1, Some(2)),
            DamageOutcome::ShieldLost { hearts_left: 0 }
        );
        assert_eq!(world.receive_damage(1, Some(2)), DamageOutcome::Ignored);
        settle(&mut world);
        assert_eq!(world.receive_damage(1, Some(2)), DamageOutcome::Killed);
        assert_eq!(world.character(1).unwrap().die_count, 1);
    }

    #[test]
    fn kill_and_suicide_scoring_in_io_mode() {
        let mut world = world();
        world.join(1, "ada");
        world.join(2, "bob");
        settle(&mut world);

        world.receive_damage(2, Some(1));
        let killer = world.character(1).unwrap();
        assert_eq!((killer.score, killer.kill_count), (15, 1));

        world.receive_damage(1, Some(1));
        let killer = world.character(1).unwrap();
        assert_eq!((killer.score, killer.kill_count), (-5, 1));
        assert!(killer.is_dead);
    }

    #[test]
    fn respawn_waits_and_resets_progress_in_io_mode() {
        let mut world = world();
        world.join(1, "ada");
        world.join(2, "bob");
        settle(&mut world);
        world.receive_damage(2, Some(1));
        world.grant_stats(
            1,
            CharacterStats {
                bomb_range: 3,
                ..CharacterStats::default()
            },
        );
        world.receive_damage(1, None);

        assert_eq!(world.respawn(1), Err(RespawnError::TooSoon));
        assert_eq!(world.respawn(2), Err(RespawnError::TooSoon));
        world.clock += 5.0;
        assert_eq!(world.respawn(1), Ok(()));
        assert_eq!(world.respawn(1), Err(RespawnError::Alive));

        let c = world.character(1).unwrap();
        assert_eq!((c.score, c.kill_count, c.die_count), (0, 0, 1));
        assert_eq!(c.add_stats.bomb_range, 0);
    }

    #[test]
    fn deathmatch_keeps_progress_and_freezes_after_end() {
        let mut world = world_with(MatchRules {
            mode: GameMode::DeathMatch,
            time_limit: Duration::from_secs(60),
            ..MatchRules::default()
        });
        world.join(1, "ada");
        world.join(2, "bob");
        settle(&mut world);
        world.receive_damage(2, Some(1));
        assert_eq!(world.character(1).unwrap().score, 1);

        world.clock += 5.0;
        world.respawn(2).unwrap();
        settle(&mut world);
        world.end_match();

        assert_eq!(world.receive_damage(2, Some(1)), DamageOutcome::Ignored);
        assert_eq!(world.plant_bomb(1), Err(PlantError::MatchEnded));
        assert_eq!(world.receive_damage(1, Some(1)), DamageOutcome::Killed);
        assert_eq!(world.character(1).unwrap().score, 1);
        world.clock += 10.0;
        assert_eq!(world.respawn(1), Err(RespawnError::MatchEnded));
    }

    #[test]
    fn leaving_orphans_bombs() {
        let mut world = world();
        world.join(1, "ada");
        let bomb = world.plant_bomb(1).unwrap();
        assert!(world.leave(1));
        assert!(!world.leave(1));
        assert_eq!(world.bomb(bomb).unwrap().owner_id, None);
    }

    #[test]
    fn rankings_follow_score() {
        let mut world = world();
        world.join(1, "ada");
        world.join(2, "bob");
        settle(&mut world);
        world.receive_damage(1, Some(2));
        let ranks = world.rankings();
        assert_eq!(ranks[0].player_id, 2);
        assert_eq!(ranks[0].rank, 1);
        assert_eq!(ranks[1].deaths, 1);
    }

    #[test]
    fn reset_match_restores_opening_state() {
        let mut world = world();
        world.join(1, "ada");
        settle(&mut world);
        world.spawn_brick(Cell::new(5, 4));
        world.receive_damage(1, Some(1));
        world.end_match();
        world.reset_match();

        let c = world.character(1).unwrap();
        assert!(!c.is_dead);
        assert_eq!(c.die_count, 0);
        assert!(!world.is_match_ended());
        assert_eq!(world.clock(), 0.0);
        // Bricks come from the layout only.
        assert!(world.brick_at(Cell::new(5, 4)).is_none());
    }
}
