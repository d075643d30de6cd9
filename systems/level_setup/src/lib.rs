#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level population, obstacle replenishment and campaign progression.
//!
//! Levels with a hint obstacle open with the adversary strolling its route:
//! the loop starts, player first, once the hint is destroyed or the opening
//! times out.

use std::time::Duration;

use hellguard_core::{
    Campaign, Command, EntityId, EntityKind, Event, LevelConfig, TileCoord,
};
use hellguard_world::{query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the level setup system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    drop_duration: Duration,
    advance_delay: Duration,
    restart_delay: Duration,
    opening_timeout: Duration,
}

impl Config {
    /// Creates a configuration with the default delays and the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            drop_duration: Duration::from_secs(1),
            advance_delay: Duration::from_secs(2),
            restart_delay: Duration::from_secs(2),
            opening_timeout: Duration::from_secs(30),
        }
    }

    /// Returns the configuration with the longest wait for the hint obstacle
    /// to be destroyed before a level starts anyway.
    #[must_use]
    pub const fn with_opening_timeout(mut self, timeout: Duration) -> Self {
        self.opening_timeout = timeout;
        self
    }

    /// Returns the configuration with the provided level transition delays.
    #[must_use]
    pub const fn with_transition_delays(mut self, advance: Duration, restart: Duration) -> Self {
        self.advance_delay = advance;
        self.restart_delay = restart;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    remaining: Duration,
    level: usize,
}

/// Wait for the hint obstacle before the loop starts.
#[derive(Clone, Copy, Debug)]
struct Opening {
    hint: Option<EntityId>,
    remaining: Duration,
}

/// Pure system that populates levels and walks the campaign.
#[derive(Debug)]
pub struct LevelSetup {
    config: Config,
    rng: ChaCha8Rng,
    campaign: Campaign,
    current: usize,
    level: Option<LevelConfig>,
    player: Option<EntityId>,
    adversary: Option<EntityId>,
    started: bool,
    opening: Option<Opening>,
    ring_tiles: Vec<TileCoord>,
    requested_obstacles: u32,
    drops: Vec<Duration>,
    transition: Option<Transition>,
    complete: bool,
}

impl LevelSetup {
    /// Creates a new level setup system walking the provided campaign.
    #[must_use]
    pub fn new(config: Config, campaign: Campaign) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            campaign,
            current: 0,
            level: None,
            player: None,
            adversary: None,
            started: false,
            opening: None,
            ring_tiles: Vec::new(),
            requested_obstacles: 0,
            drops: Vec::new(),
            transition: None,
            complete: false,
        }
    }

    /// Emits the configuration of the campaign's first level.
    pub fn begin(&mut self, out: &mut Vec<Command>) {
        self.complete = false;
        self.configure(0, out);
    }

    /// Index of the level being played.
    #[must_use]
    pub fn current_level(&self) -> usize {
        self.current
    }

    /// Whether the last level of the campaign has been cleared.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the level is waiting for its hint obstacle before starting.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.opening.is_some()
    }

    /// Consumes world events and emits setup commands.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelConfigured { level, center } => self.populate(level, *center, world, out),
                Event::EntitySpawned { entity, kind, tile } => {
                    match kind {
                        EntityKind::Player => self.player = Some(*entity),
                        EntityKind::Adversary => self.adversary = Some(*entity),
                        EntityKind::Obstacle => {
                            self.requested_obstacles = self.requested_obstacles.saturating_sub(1);
                            self.note_hint(*entity, *tile);
                        }
                    }
                    self.start_when_ready(out);
                }
                Event::SpawnRejected {
                    kind: EntityKind::Obstacle,
                    ..
                } => {
                    self.requested_obstacles = self.requested_obstacles.saturating_sub(1);
                }
                Event::EntityWillDie {
                    entity,
                    kind: EntityKind::Obstacle,
                    tile,
                } => {
                    if self.opening.is_some_and(|opening| opening.hint == Some(*entity)) {
                        log::debug!("hint obstacle destroyed");
                        self.opening = None;
                        self.start_when_ready(out);
                    } else {
                        self.replenish(*tile, world, out);
                    }
                }
                Event::LevelCleared => {
                    self.opening = None;
                    self.level_cleared();
                }
                Event::LevelLost => {
                    self.opening = None;
                    log::info!("level {} lost, restarting", self.current + 1);
                    self.transition = Some(Transition {
                        remaining: self.config.restart_delay,
                        level: self.current,
                    });
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                _ => {}
            }
        }
    }

    fn configure(&mut self, index: usize, out: &mut Vec<Command>) {
        let Some(level) = self.campaign.levels.get(index) else {
            log::error!("campaign has no level {index}");
            return;
        };
        self.current = index;
        out.push(Command::ConfigureLevel {
            level: level.clone(),
        });
    }

    fn populate(&mut self, level: &LevelConfig, center: TileCoord, world: &World, out: &mut Vec<Command>) {
        self.level = Some(level.clone());
        self.player = None;
        self.adversary = None;
        self.started = false;
        self.opening = level.obstacles.hint.then_some(Opening {
            hint: None,
            remaining: self.config.opening_timeout,
        });
        self.ring_tiles.clear();
        self.requested_obstacles = 0;
        self.drops.clear();
        self.transition = None;

        for radius in level.obstacles.ring_radii.iter().copied().filter(|radius| *radius > 0) {
            let radius = i32::try_from(radius).unwrap_or(i32::MAX);
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    let tile = center.offset(dx, dy);
                    if dx.abs() + dy.abs() == radius && query::tile_at(world, tile.x(), tile.y()).is_some() {
                        self.ring_tiles.push(tile);
                        out.push(Command::SpawnEntity {
                            kind: EntityKind::Obstacle,
                            tile,
                            stats: level.obstacles.stats,
                        });
                    }
                }
            }
        }
        out.push(Command::SpawnEntity {
            kind: EntityKind::Player,
            tile: center,
            stats: level.player.stats,
        });
    }

    /// The first obstacle spawned off the rings before the start is the hint.
    fn note_hint(&mut self, entity: EntityId, tile: TileCoord) {
        if self.started || self.ring_tiles.contains(&tile) {
            return;
        }
        if let Some(opening) = self.opening.as_mut().filter(|opening| opening.hint.is_none()) {
            log::debug!("hint obstacle {entity:?} stands on {tile:?}");
            opening.hint = Some(entity);
        }
    }

    fn start_when_ready(&mut self, out: &mut Vec<Command>) {
        if self.started || self.opening.is_some() || self.transition.is_some() || self.complete {
            return;
        }
        let (Some(player), Some(adversary), Some(level)) =
            (self.player, self.adversary, self.level.as_ref())
        else {
            return;
        };
        let first = if level.obstacles.hint { player } else { adversary };
        log::debug!("level {} ready, {first:?} acts first", self.current + 1);
        out.push(Command::SetStartingEntity { entity: first });
        out.push(Command::StartLoop);
        self.started = true;
    }

    fn replenish(&mut self, dying: Option<TileCoord>, world: &World, out: &mut Vec<Command>) {
        let Some(level) = self.level.as_ref() else {
            return;
        };
        if !self.started || self.transition.is_some() || query::outcome(world).is_some() {
            return;
        }
        let alive = u32::try_from(query::living(world, EntityKind::Obstacle).len()).unwrap_or(u32::MAX);
        if alive.saturating_add(self.requested_obstacles) >= level.obstacles.minimum {
            return;
        }

        let edge = i32::try_from(level.grid_size).unwrap_or(i32::MAX) - 1;
        let candidates: Vec<TileCoord> = query::empty_tiles(world)
            .into_iter()
            .filter(|tile| Some(*tile) != dying)
            .filter(|tile| tile.x() > 0 && tile.y() > 0 && tile.x() < edge && tile.y() < edge)
            .collect();
        if candidates.is_empty() {
            log::warn!("no free tile left to drop a replacement obstacle");
            return;
        }
        let tile = candidates[self.rng.gen_range(0..candidates.len())];
        log::debug!("dropping replacement obstacle on {tile:?}");

        out.push(Command::PauseLoop);
        out.push(Command::SpawnEntity {
            kind: EntityKind::Obstacle,
            tile,
            stats: level.obstacles.stats,
        });
        self.requested_obstacles += 1;
        self.drops.push(self.config.drop_duration);
    }

    fn level_cleared(&mut self) {
        let next = self.current + 1;
        if next < self.campaign.levels.len() {
            log::info!("level {} cleared", self.current + 1);
            self.transition = Some(Transition {
                remaining: self.config.advance_delay,
                level: next,
            });
        } else {
            log::info!("campaign complete");
            self.complete = true;
        }
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        if let Some(opening) = self.opening.as_mut() {
            opening.remaining = opening.remaining.saturating_sub(dt);
            if opening.remaining.is_zero() {
                log::warn!("hint obstacle still standing, starting level {} anyway", self.current + 1);
                self.opening = None;
                self.start_when_ready(out);
            }
        }

        if !self.drops.is_empty() {
            for drop in &mut self.drops {
                *drop = drop.saturating_sub(dt);
            }
            self.drops.retain(|drop| !drop.is_zero());
            if self.drops.is_empty() {
                out.push(Command::ResumeLoop);
            }
        }

        if let Some(transition) = self.transition.as_mut() {
            transition.remaining = transition.remaining.saturating_sub(dt);
            if transition.remaining.is_zero() {
                let level = transition.level;
                self.transition = None;
                self.configure(level, out);
            }
        }
    }
}
