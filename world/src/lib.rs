#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Hellguard tactics.
//!
//! The world owns the tile grid, every entity standing on it, the turn
//! scheduler, and the in-flight actions that resolve over simulated time. It
//! is mutated exclusively through [`apply`] and observed through [`query`].

mod actions;
mod entities;
mod grid;
mod navigation;
mod turns;

use std::time::Duration;

use hellguard_core::{
    ActionError, Command, EntityId, EntityKind, EntityStats, Event, LevelConfig, PlayerAction,
    SpawnError, TileCoord,
};

use crate::{actions::Motions, entities::EntityRegistry, turns::TurnScheduler};

pub use grid::{Grid, Tile};

/// Durations and speeds used while resolving actions over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timings {
    /// Time spent transiting each tile of a walk.
    pub step_duration: Duration,
    /// Speed of thrown entities in tiles per second.
    pub throw_speed: f32,
    /// Fraction of a throw's flight after which its landing tile is cleared.
    pub chain_check_fraction: f32,
    /// Pause between touching down and claiming the landing tile.
    pub landing_settle: Duration,
    /// Distance a fresh projectile has already covered inside its first tile.
    pub projectile_head_start: f32,
    /// Speed of leaps in tiles per second.
    pub leap_speed: f32,
    /// Time a defeated entity takes to sink out of view after lingering.
    pub despawn_sink: Duration,
    /// Pause between one turn finishing and the next starting.
    pub turn_interlude: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            step_duration: Duration::from_millis(200),
            throw_speed: 5.0,
            chain_check_fraction: 0.3,
            landing_settle: Duration::from_millis(100),
            projectile_head_start: 0.7,
            leap_speed: 10.0,
            despawn_sink: Duration::from_secs(2),
            turn_interlude: Duration::from_millis(500),
        }
    }
}

/// Result of a level once it can no longer continue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOutcome {
    /// Every adversary was defeated.
    Cleared,
    /// The player was defeated.
    Lost,
}

/// Represents the authoritative Hellguard world state.
#[derive(Debug)]
pub struct World {
    timings: Timings,
    level: Option<LevelConfig>,
    grid: Grid,
    entities: EntityRegistry,
    scheduler: TurnScheduler,
    motions: Motions,
    pointer: Option<TileCoord>,
    unlocked: Vec<PlayerAction>,
    outcome: Option<LevelOutcome>,
}

impl World {
    /// Creates an empty world using the default timings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timings(Timings::default())
    }

    /// Creates an empty world that resolves actions with the provided timings.
    #[must_use]
    pub fn with_timings(timings: Timings) -> Self {
        Self {
            timings,
            level: None,
            grid: Grid::default(),
            entities: EntityRegistry::default(),
            scheduler: TurnScheduler::new(timings.turn_interlude),
            motions: Motions::default(),
            pointer: None,
            unlocked: Vec::new(),
            outcome: None,
        }
    }

    fn configure_level(&mut self, level: LevelConfig, out_events: &mut Vec<Event>) {
        let mut level = level;
        level.grid_size = level.normalized_grid_size();

        self.grid = Grid::new(level.grid_size);
        self.entities.clear();
        self.scheduler.reset();
        self.motions = Motions::default();
        self.pointer = None;
        self.unlocked = level.allowed_actions.clone();
        self.outcome = None;

        let Some(center) = self.grid.center() else {
            log::error!("level grid of size {} has no tiles", level.grid_size);
            return;
        };
        log::debug!("configured {0}x{0} level centered on {center:?}", level.grid_size);
        self.level = Some(level.clone());
        out_events.push(Event::LevelConfigured { level, center });
    }

    fn spawn(
        &mut self,
        kind: EntityKind,
        tile: TileCoord,
        stats: EntityStats,
        out_events: &mut Vec<Event>,
    ) -> Result<EntityId, SpawnError> {
        if self.level.is_none() {
            return Err(SpawnError::NoLevel);
        }
        if !self.grid.contains(tile) {
            return Err(SpawnError::OutOfBounds);
        }
        if self.grid.is_occupied(tile) {
            return Err(SpawnError::Occupied);
        }

        let entity = self.entities.insert(kind, tile, stats);
        let _ = self.grid.occupy(tile, entity);
        if kind.is_character() {
            self.scheduler.enroll(entity);
        }
        out_events.push(Event::EntitySpawned { entity, kind, tile });
        Ok(entity)
    }

    /// Removes an entity immediately, releasing its tile and roster slot.
    fn despawn(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        let Some(state) = self.entities.remove(entity) else {
            return;
        };
        if let Some(tile) = state.grounded_tile() {
            let _ = self.grid.vacate(tile, entity);
        }
        self.scheduler.withdraw(entity);
        self.motions.forget(entity);
        out_events.push(Event::EntityDespawned { entity });
    }

    fn announce_turn(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        match self.entities.get(entity) {
            Some(state) => out_events.push(Event::TurnStarted {
                entity,
                kind: state.kind,
            }),
            None => log::error!("turn handed to unknown {entity:?}"),
        }
    }

    fn point_at(&mut self, tile: Option<TileCoord>, out_events: &mut Vec<Event>) {
        let tile = tile.filter(|coord| self.grid.contains(*coord));
        if tile != self.pointer {
            self.pointer = tile;
            out_events.push(Event::PointerMoved { tile });
        }
    }

    fn unlock(&mut self, action: PlayerAction, out_events: &mut Vec<Event>) {
        if self.unlocked.contains(&action) {
            return;
        }
        self.unlocked.push(action);
        out_events.push(Event::ActionUnlocked { action });
    }

    fn conclude(&mut self, outcome: LevelOutcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        self.scheduler.stop();
        out_events.push(match outcome {
            LevelOutcome::Cleared => Event::LevelCleared,
            LevelOutcome::Lost => Event::LevelLost,
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureLevel { level } => world.configure_level(level, out_events),
        Command::SpawnEntity { kind, tile, stats } => {
            if let Err(reason) = world.spawn(kind, tile, stats, out_events) {
                log::warn!("rejected {kind:?} spawn on {tile:?}: {reason:?}");
                out_events.push(Event::SpawnRejected { kind, tile, reason });
            }
        }
        Command::DespawnEntity { entity } => world.despawn(entity, out_events),
        Command::SetStartingEntity { entity } => {
            if !world.scheduler.set_starting(entity) {
                log::debug!("ignored starting entity {entity:?}");
            }
        }
        Command::StartLoop => {
            if let Some(first) = world.scheduler.start() {
                out_events.push(Event::LoopStarted { first });
                world.announce_turn(first, out_events);
            }
        }
        Command::PauseLoop => world.scheduler.pause(),
        Command::ResumeLoop => world.scheduler.resume(),
        Command::FinishTurn { entity } => {
            if world.scheduler.finish(entity) {
                out_events.push(Event::TurnFinished { entity });
            }
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.advance_motions(dt, out_events);
            if let Some(next) = world.scheduler.advance(dt) {
                world.announce_turn(next, out_events);
            }
        }
        Command::PointAt { tile } => world.point_at(tile, out_events),
        Command::ChooseAction { action } => out_events.push(Event::ActionChosen { action }),
        Command::SelectEntity { entity } => {
            let selectable = world
                .entities
                .get(entity)
                .map_or(false, |state| !state.dead);
            if selectable {
                out_events.push(Event::EntitySelected { entity });
            }
        }
        Command::ConfirmPointer => out_events.push(Event::PointerConfirmed {
            tile: world.pointer,
        }),
        Command::MoveAlongPath { entity, path } => {
            let result = world.begin_walk(entity, path);
            reject_on_error(entity, result, out_events);
        }
        Command::Melee {
            attacker,
            target,
            advance,
        } => {
            let result = world.resolve_melee(attacker, target, advance, out_events);
            reject_on_error(attacker, result, out_events);
        }
        Command::FireProjectile {
            shooter,
            origin,
            direction,
            speed,
        } => {
            let result = world.launch_projectile(shooter, origin, direction, speed, out_events);
            reject_on_error(shooter, result, out_events);
        }
        Command::Leap {
            entity,
            destination,
        } => {
            let result = world.begin_leap(entity, destination);
            reject_on_error(entity, result, out_events);
        }
    }
}

fn reject_on_error(entity: EntityId, result: Result<(), ActionError>, out_events: &mut Vec<Event>) {
    if let Err(reason) = result {
        log::warn!("rejected action for {entity:?}: {reason:?}");
        out_events.push(Event::ActionRejected { entity, reason });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeSet;

    use glam::Vec3;
    use hellguard_core::{
        EntityId, EntityKind, EntitySnapshot, LevelConfig, LoopStatus, OccupancyView,
        PlayerAction, TileCoord,
    };

    use super::{navigation, Grid, LevelOutcome, Tile, Timings, World};

    /// Provides read-only access to the tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Every tile of the current level in row-major order.
    #[must_use]
    pub fn tiles(world: &World) -> &[Tile] {
        world.grid.tiles()
    }

    /// Tile at the provided column and row, or `None` outside the grid.
    #[must_use]
    pub fn tile_at(world: &World, x: i32, y: i32) -> Option<&Tile> {
        world.grid.tile_at(x, y)
    }

    /// World-space anchor of a tile, used by presentation adapters.
    #[must_use]
    pub fn tile_anchor(world: &World, coord: TileCoord) -> Option<Vec3> {
        world.grid.tile(coord).map(Tile::anchor)
    }

    /// Center tile of the current level.
    #[must_use]
    pub fn center(world: &World) -> Option<TileCoord> {
        world.grid.center()
    }

    /// Tiles within `range` steps of `origin`, excluding the origin.
    #[must_use]
    pub fn reachable_tiles(
        world: &World,
        origin: TileCoord,
        range: i32,
        include_occupied: bool,
    ) -> BTreeSet<TileCoord> {
        navigation::reachable_tiles(&world.grid, origin, range, include_occupied)
    }

    /// Path from `origin` to `target`, excluding the origin.
    #[must_use]
    pub fn path(
        world: &World,
        origin: TileCoord,
        target: TileCoord,
        include_occupied: bool,
    ) -> Vec<TileCoord> {
        navigation::path(&world.grid, origin, target, include_occupied)
    }

    /// Tile currently under the input pointer.
    #[must_use]
    pub fn pointed_tile(world: &World) -> Option<TileCoord> {
        world.pointer
    }

    /// Entity occupying the coordinate, if any.
    #[must_use]
    pub fn occupant(world: &World, coord: TileCoord) -> Option<EntityId> {
        world.grid.occupant(coord)
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.grid.occupancy_view()
    }

    /// Tiles that currently hold no entity.
    #[must_use]
    pub fn empty_tiles(world: &World) -> Vec<TileCoord> {
        world
            .grid
            .tiles()
            .iter()
            .map(Tile::coord)
            .filter(|coord| !world.grid.is_occupied(*coord))
            .collect()
    }

    /// Snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(id).map(|state| state.snapshot())
    }

    /// Snapshots of every entity ordered by identifier.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntitySnapshot> {
        world.entities.iter().map(|state| state.snapshot()).collect()
    }

    /// Snapshots of the living entities of one kind ordered by identifier.
    #[must_use]
    pub fn living(world: &World, kind: EntityKind) -> Vec<EntitySnapshot> {
        world
            .entities
            .iter()
            .filter(|state| state.kind == kind && !state.dead)
            .map(|state| state.snapshot())
            .collect()
    }

    /// Observable state of the turn loop.
    #[must_use]
    pub fn loop_status(world: &World) -> LoopStatus {
        world.scheduler.status()
    }

    /// Entity currently in control of the turn.
    #[must_use]
    pub fn active_entity(world: &World) -> Option<EntityId> {
        world.scheduler.active()
    }

    /// Entities taking turns, in rotation order.
    #[must_use]
    pub fn roster(world: &World) -> &[EntityId] {
        world.scheduler.roster()
    }

    /// Player actions currently available.
    #[must_use]
    pub fn unlocked_actions(world: &World) -> &[PlayerAction] {
        &world.unlocked
    }

    /// Whether the provided player action is available.
    #[must_use]
    pub fn is_unlocked(world: &World, action: PlayerAction) -> bool {
        action == PlayerAction::Cancel || world.unlocked.contains(&action)
    }

    /// Configuration of the current level.
    #[must_use]
    pub fn level(world: &World) -> Option<&LevelConfig> {
        world.level.as_ref()
    }

    /// Outcome of the current level, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<LevelOutcome> {
        world.outcome
    }

    /// Whether no walk, flight, projectile, leap, or despawn is in progress.
    #[must_use]
    pub fn is_settled(world: &World) -> bool {
        world.motions.is_empty()
    }

    /// Timings used to resolve actions.
    #[must_use]
    pub fn timings(world: &World) -> &Timings {
        &world.timings
    }
}
