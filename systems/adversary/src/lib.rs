#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adversary decision engine.
//!
//! The adversary patrols a square ring around the level center while its
//! health stays above the berserk threshold, stepping with a safety lookahead
//! and striking whatever blocks its route. At or below the threshold it leaps
//! to the center and fires volleys along a rotating facing.
//!
//! On levels that drop a hint obstacle the adversary strolls its route
//! before the loop starts, chaining patrol turns without handing the turn
//! over, until the level starts the loop.

mod patrol;

use std::time::Duration;

use hellguard_core::{
    AdversaryConfig, Command, Direction, EntityId, EntityKind, Event, LevelConfig, TileCoord,
};
use hellguard_world::{query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use patrol::{looks_safe_to_move, Actors, PatrolPlan, PatrolState};

/// Order in which the berserk facing rotates, one step per volley.
const BERSERK_FACINGS: [Direction; 4] = [
    Direction::South,
    Direction::East,
    Direction::North,
    Direction::West,
];

/// Delays the adversary observes while taking its turn.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    correction_wind_up: Duration,
    correction_pause: Duration,
    leap_wind_up: Duration,
    volley_wind_up: Duration,
    volley_pause: Duration,
    stroll_pause: Duration,
}

impl Config {
    /// Creates a configuration with the default delays and the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            correction_wind_up: Duration::from_secs(1),
            correction_pause: Duration::from_secs(1),
            leap_wind_up: Duration::from_millis(1500),
            volley_wind_up: Duration::from_millis(1500),
            volley_pause: Duration::from_secs(1),
            stroll_pause: Duration::from_millis(500),
        }
    }

    /// Returns the configuration with every delay replaced by `delay`.
    #[must_use]
    pub const fn with_uniform_delay(mut self, delay: Duration) -> Self {
        self.correction_wind_up = delay;
        self.correction_pause = delay;
        self.leap_wind_up = delay;
        self.volley_wind_up = delay;
        self.volley_pause = delay;
        self.stroll_pause = delay;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Turn {
    Idle,
    Strolling {
        remaining: Duration,
    },
    CorrectionWindUp {
        remaining: Duration,
        origin: TileCoord,
        direction: Direction,
    },
    AwaitingShots {
        outstanding: usize,
        pause: Duration,
        resume: Resume,
    },
    Pausing {
        remaining: Duration,
        resume: Resume,
    },
    Walking {
        strike: Option<TileCoord>,
    },
    Striking,
    LeapWindUp {
        remaining: Duration,
        from: TileCoord,
    },
    Leaping {
        from: TileCoord,
    },
    VolleyWindUp {
        remaining: Duration,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resume {
    Patrol,
    Finish,
}

/// Level parameters the adversary keeps between turns.
#[derive(Clone, Debug)]
struct Brief {
    adversary: AdversaryConfig,
    center: TileCoord,
}

/// Pure system steering the adversary through its turns.
#[derive(Debug)]
pub struct Adversary {
    config: Config,
    rng: ChaCha8Rng,
    brief: Option<Brief>,
    patrol: Option<PatrolState>,
    entity: Option<EntityId>,
    player: Option<EntityId>,
    facing: Direction,
    facing_step: i64,
    strolling: bool,
    turn: Turn,
}

impl Adversary {
    /// Creates a new adversary system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            brief: None,
            patrol: None,
            entity: None,
            player: None,
            facing: Direction::North,
            facing_step: 0,
            strolling: false,
            turn: Turn::Idle,
        }
    }

    /// Identifier of the adversary spawned for the current level.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Current patrol bookkeeping, once a level is configured.
    #[must_use]
    pub fn patrol(&self) -> Option<&PatrolState> {
        self.patrol.as_ref()
    }

    /// Direction the next volley will be aimed at.
    #[must_use]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Whether the adversary is in the middle of its turn.
    #[must_use]
    pub fn is_acting(&self) -> bool {
        self.turn != Turn::Idle
    }

    /// Whether the adversary is still strolling ahead of the loop start.
    #[must_use]
    pub fn is_strolling(&self) -> bool {
        self.strolling
    }

    /// Consumes world events and emits the adversary's commands.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelConfigured { level, center } => self.prepare(level, *center, out),
                Event::EntitySpawned { entity, kind, .. } => match kind {
                    EntityKind::Adversary => self.entity = Some(*entity),
                    EntityKind::Player => self.player = Some(*entity),
                    EntityKind::Obstacle => {}
                },
                Event::EntityWillDie { entity, .. } => {
                    if Some(*entity) == self.player {
                        self.player = None;
                    }
                    if Some(*entity) == self.entity {
                        self.strolling = false;
                        self.turn = Turn::Idle;
                    }
                }
                Event::LevelCleared | Event::LevelLost => {
                    self.strolling = false;
                    self.turn = Turn::Idle;
                }
                Event::LoopStarted { .. } => self.stop_strolling(),
                Event::TurnStarted { entity, .. } if Some(*entity) == self.entity => {
                    self.begin_turn(world, out);
                }
                Event::ActionCompleted { entity } if Some(*entity) == self.entity => {
                    self.action_completed(world, out);
                }
                Event::ActionRejected { entity, reason } if Some(*entity) == self.entity => {
                    log::warn!("adversary action rejected: {reason:?}");
                    match self.turn {
                        Turn::Idle => {}
                        Turn::AwaitingShots { .. } => self.resolve_shot(),
                        _ => self.finish(out),
                    }
                }
                Event::ProjectileDetonated { shooter, .. } if Some(*shooter) == self.entity => {
                    self.resolve_shot();
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, world, out),
                _ => {}
            }
        }
    }

    fn prepare(&mut self, level: &LevelConfig, center: TileCoord, out: &mut Vec<Command>) {
        self.turn = Turn::Idle;
        self.entity = None;
        self.player = None;
        self.facing = Direction::North;
        self.facing_step = 0;
        self.strolling = false;
        self.brief = Some(Brief {
            adversary: level.adversary.clone(),
            center,
        });

        let ring = PatrolState::ring(center, level.adversary.patrol_radius);
        if ring.route().is_empty() {
            log::error!("level has no patrol route for the adversary");
            self.patrol = None;
            return;
        }
        let start = self.rng.gen_range(0..ring.route().len());
        let forward = self.rng.gen_bool(0.5);
        let patrol = ring.positioned(start, forward);

        if let Some(tile) = patrol.current_tile() {
            out.push(Command::SpawnEntity {
                kind: EntityKind::Adversary,
                tile,
                stats: level.adversary.stats,
            });
        }
        if level.obstacles.hint {
            if let Some(tile) = patrol.next_tile(level.adversary.movement) {
                log::debug!("dropping hint obstacle on {tile:?}");
                out.push(Command::SpawnEntity {
                    kind: EntityKind::Obstacle,
                    tile,
                    stats: level.obstacles.stats,
                });
            }
            self.strolling = true;
            self.turn = Turn::Strolling {
                remaining: self.config.stroll_pause,
            };
        }
        self.patrol = Some(patrol);
    }

    fn stop_strolling(&mut self) {
        if !self.strolling {
            return;
        }
        self.strolling = false;
        if matches!(self.turn, Turn::Strolling { .. }) {
            self.turn = Turn::Idle;
        }
    }

    fn begin_turn(&mut self, world: &World, out: &mut Vec<Command>) {
        let Some(snapshot) = self.entity.and_then(|entity| query::entity(world, entity)) else {
            return;
        };
        let Some((threshold, center)) = self
            .brief
            .as_ref()
            .map(|brief| (brief.adversary.berserk_threshold, brief.center))
        else {
            self.finish(out);
            return;
        };
        let Some(tile) = snapshot.grounded_tile() else {
            log::debug!("adversary is off the board and skips its turn");
            self.finish(out);
            return;
        };

        if snapshot.health > threshold {
            self.begin_patrol(tile, world, out);
        } else if tile != center {
            self.turn = Turn::LeapWindUp {
                remaining: self.config.leap_wind_up,
                from: tile,
            };
        } else {
            self.aim(tile, world);
        }
    }

    /// Runs one patrol turn of the pre-loop stroll regardless of health.
    fn stroll(&mut self, world: &World, out: &mut Vec<Command>) {
        let tile = self
            .entity
            .and_then(|entity| query::entity(world, entity))
            .and_then(|snapshot| snapshot.grounded_tile());
        match tile {
            Some(tile) => self.begin_patrol(tile, world, out),
            None => self.stop_strolling(),
        }
    }

    fn begin_patrol(&mut self, tile: TileCoord, world: &World, out: &mut Vec<Command>) {
        let Some(patrol) = self.patrol.as_mut() else {
            self.finish(out);
            return;
        };

        if let Some(index) = patrol.position_of(tile) {
            patrol.resync(index);
            self.step_patrol(0, world, out);
            return;
        }

        let expected = patrol.current_tile();
        patrol.rewind();
        match expected {
            Some(expected) => {
                let direction = self.face_toward(tile, expected);
                log::debug!("adversary knocked off its route, firing {direction:?}");
                self.turn = Turn::CorrectionWindUp {
                    remaining: self.config.correction_wind_up,
                    origin: tile,
                    direction,
                };
            }
            None => self.step_patrol(1, world, out),
        }
    }

    fn step_patrol(&mut self, first_move: u32, world: &World, out: &mut Vec<Command>) {
        let (Some(entity), Some(brief), Some(patrol)) =
            (self.entity, self.brief.as_ref(), self.patrol.as_mut())
        else {
            self.finish(out);
            return;
        };

        let occupancy = query::occupancy_view(world);
        let actors = Actors {
            adversary: entity,
            player: self.player,
        };
        let plan = patrol.plan(&occupancy, actors, first_move, brief.adversary.movement);
        log::debug!("adversary patrol plan: {plan:?}");

        if !plan.path.is_empty() {
            out.push(Command::MoveAlongPath {
                entity,
                path: plan.path,
            });
            self.turn = Turn::Walking {
                strike: plan.strike,
            };
        } else if let Some(target) = plan.strike {
            self.strike(entity, target, out);
        } else {
            self.finish(out);
        }
    }

    fn strike(&mut self, entity: EntityId, target: TileCoord, out: &mut Vec<Command>) {
        out.push(Command::Melee {
            attacker: entity,
            target,
            advance: true,
        });
        self.turn = Turn::Striking;
    }

    fn action_completed(&mut self, world: &World, out: &mut Vec<Command>) {
        match self.turn.clone() {
            Turn::Walking {
                strike: Some(target),
            } => match self.entity {
                Some(entity) => self.strike(entity, target, out),
                None => self.finish(out),
            },
            Turn::Walking { strike: None } | Turn::Striking => self.finish(out),
            Turn::Leaping { from } => {
                self.facing_step = 1;
                let landing = self
                    .entity
                    .and_then(|entity| query::entity(world, entity))
                    .and_then(|snapshot| snapshot.grounded_tile());
                match landing {
                    Some(landing) => {
                        self.facing = self.face_toward(landing, from);
                        self.facing = self.rotate_facing(-self.facing_step);
                        self.aim(landing, world);
                    }
                    None => self.finish(out),
                }
            }
            _ => {}
        }
    }

    /// Steps the facing and snaps it toward an aligned player.
    fn aim(&mut self, tile: TileCoord, world: &World) {
        self.facing = self.rotate_facing(self.facing_step);
        let player_tile = self
            .player
            .and_then(|player| query::entity(world, player))
            .and_then(|snapshot| snapshot.grounded_tile());
        if let Some(player_tile) = player_tile.filter(|player| tile.is_aligned_with(*player)) {
            if let Some(direction) = Direction::toward(tile, player_tile) {
                log::debug!("adversary snaps its aim {direction:?} toward the player");
                self.facing = direction;
            }
        }
        self.turn = Turn::VolleyWindUp {
            remaining: self.config.volley_wind_up,
        };
    }

    /// Facing `step` places further along the berserk rotation.
    fn rotate_facing(&self, step: i64) -> Direction {
        let position = BERSERK_FACINGS
            .iter()
            .position(|direction| *direction == self.facing)
            .unwrap_or_default() as i64;
        BERSERK_FACINGS[(position + step).rem_euclid(BERSERK_FACINGS.len() as i64) as usize]
    }

    /// Dominant direction from `from` to `to`; diagonal ties pick an axis at random.
    fn face_toward(&mut self, from: TileCoord, to: TileCoord) -> Direction {
        if let Some(direction) = Direction::toward(from, to) {
            return direction;
        }
        if from == to {
            return self.facing;
        }
        if self.rng.gen_bool(0.5) {
            Direction::horizontal(to.x() - from.x())
        } else {
            Direction::vertical(to.y() - from.y())
        }
    }

    fn fire_volley(&mut self, world: &World, out: &mut Vec<Command>) {
        let Some(speed) = self
            .brief
            .as_ref()
            .map(|brief| brief.adversary.projectile_speed)
        else {
            self.finish(out);
            return;
        };
        let Some((entity, tile)) = self.entity.and_then(|entity| {
            query::entity(world, entity)
                .and_then(|snapshot| snapshot.grounded_tile())
                .map(|tile| (entity, tile))
        }) else {
            self.finish(out);
            return;
        };

        let clockwise = self.facing.index() as i64;
        let flanks = [clockwise + 1, clockwise - 1]
            .into_iter()
            .map(Direction::from_index)
            .map(|side| tile.step(side))
            .filter(|origin| query::tile_anchor(world, *origin).is_some());
        let origins: Vec<TileCoord> = std::iter::once(tile).chain(flanks).collect();

        for origin in &origins {
            out.push(Command::FireProjectile {
                shooter: entity,
                origin: *origin,
                direction: self.facing,
                speed,
            });
        }
        log::debug!("adversary volley {:?} from {origins:?}", self.facing);
        self.turn = Turn::AwaitingShots {
            outstanding: origins.len(),
            pause: self.config.volley_pause,
            resume: Resume::Finish,
        };
    }

    fn resolve_shot(&mut self) {
        if let Turn::AwaitingShots {
            outstanding,
            pause,
            resume,
        } = self.turn
        {
            let outstanding = outstanding.saturating_sub(1);
            self.turn = if outstanding == 0 {
                Turn::Pausing {
                    remaining: pause,
                    resume,
                }
            } else {
                Turn::AwaitingShots {
                    outstanding,
                    pause,
                    resume,
                }
            };
        }
    }

    fn advance(&mut self, dt: Duration, world: &World, out: &mut Vec<Command>) {
        match &mut self.turn {
            Turn::Strolling { remaining } => {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.stroll(world, out);
                }
            }
            Turn::CorrectionWindUp {
                remaining,
                origin,
                direction,
            } => {
                *remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return;
                }
                let (origin, direction) = (*origin, *direction);
                let (Some(entity), Some(brief)) = (self.entity, self.brief.as_ref()) else {
                    self.finish(out);
                    return;
                };
                out.push(Command::FireProjectile {
                    shooter: entity,
                    origin,
                    direction,
                    speed: brief.adversary.projectile_speed,
                });
                self.turn = Turn::AwaitingShots {
                    outstanding: 1,
                    pause: self.config.correction_pause,
                    resume: Resume::Patrol,
                };
            }
            Turn::Pausing { remaining, resume } => {
                *remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return;
                }
                let resume = *resume;
                match resume {
                    Resume::Patrol => self.step_patrol(1, world, out),
                    Resume::Finish => self.finish(out),
                }
            }
            Turn::LeapWindUp { remaining, from } => {
                *remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return;
                }
                let from = *from;
                let (Some(entity), Some(brief)) = (self.entity, self.brief.as_ref()) else {
                    self.finish(out);
                    return;
                };
                out.push(Command::Leap {
                    entity,
                    destination: brief.center,
                });
                self.turn = Turn::Leaping { from };
            }
            Turn::VolleyWindUp { remaining } => {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.fire_volley(world, out);
                }
            }
            Turn::Idle
            | Turn::AwaitingShots { .. }
            | Turn::Walking { .. }
            | Turn::Striking
            | Turn::Leaping { .. } => {}
        }
    }

    fn finish(&mut self, out: &mut Vec<Command>) {
        if self.strolling {
            self.turn = Turn::Strolling {
                remaining: self.config.stroll_pause,
            };
            return;
        }
        self.turn = Turn::Idle;
        if let Some(entity) = self.entity {
            out.push(Command::FinishTurn { entity });
        }
    }
}

impl Default for Adversary {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
