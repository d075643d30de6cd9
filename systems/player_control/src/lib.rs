#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player turn state machine.
//!
//! During the player's turn the system waits for an action choice, offers the
//! valid targets for it, and converts a confirmed target into a world command
//! after the action's wind-up. Once the command resolves and the recovery
//! delay elapsed the turn is finished.

use std::{collections::BTreeSet, time::Duration};

use hellguard_core::{Command, Direction, EntityId, EntityKind, Event, PlayerAction, TileCoord};
use hellguard_world::{query, World};

/// Delays framing the player's actions.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    punch_wind_up: Duration,
    punch_recovery: Duration,
    shoot_wind_up: Duration,
    shoot_recovery: Duration,
}

impl Config {
    /// Creates a configuration from explicit punch and shot delays.
    #[must_use]
    pub const fn new(
        punch_wind_up: Duration,
        punch_recovery: Duration,
        shoot_wind_up: Duration,
        shoot_recovery: Duration,
    ) -> Self {
        Self {
            punch_wind_up,
            punch_recovery,
            shoot_wind_up,
            shoot_recovery,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(500),
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_millis(200),
        )
    }
}

/// Tiles the presentation layer should highlight for the current choice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlights {
    /// Tiles the chosen action may target.
    pub targets: BTreeSet<TileCoord>,
    /// Tiles emphasized for the pointed target: a path preview, the struck
    /// tile, or the aimed ray.
    pub emphasized: Vec<TileCoord>,
}

/// Observable stage of the player's turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// It is not the player's turn.
    Waiting,
    /// The player picks an action.
    Choosing,
    /// The player picks a target for the action.
    Aiming(PlayerAction),
    /// A committed action is charging.
    WindUp,
    /// A committed action is resolving in the world.
    Resolving,
    /// The player recovers before the turn ends.
    Recovering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strike {
    Punch(TileCoord),
    Shoot(Direction),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Waiting,
    Choosing,
    Aiming(PlayerAction),
    WindUp { remaining: Duration, strike: Strike },
    Resolving(PlayerAction),
    Recovering { remaining: Duration },
}

/// Pure system converting player input events into world commands.
#[derive(Debug)]
pub struct PlayerControl {
    config: Config,
    entity: Option<EntityId>,
    reach: i32,
    projectile_speed: f32,
    phase: Phase,
    highlights: Highlights,
}

impl PlayerControl {
    /// Creates a new player control system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            entity: None,
            reach: 0,
            projectile_speed: 0.0,
            phase: Phase::Waiting,
            highlights: Highlights::default(),
        }
    }

    /// Identifier of the player for the current level.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Current stage of the player's turn.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self.phase {
            Phase::Waiting => Stage::Waiting,
            Phase::Choosing => Stage::Choosing,
            Phase::Aiming(action) => Stage::Aiming(action),
            Phase::WindUp { .. } => Stage::WindUp,
            Phase::Resolving(_) => Stage::Resolving,
            Phase::Recovering { .. } => Stage::Recovering,
        }
    }

    /// Tiles to highlight for the action being aimed.
    #[must_use]
    pub fn highlights(&self) -> &Highlights {
        &self.highlights
    }

    /// Consumes world events and emits the player's commands.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelConfigured { level, .. } => {
                    self.entity = None;
                    self.reach = level.player_reach();
                    self.projectile_speed = level.player.projectile_speed;
                    self.reset();
                }
                Event::EntitySpawned {
                    entity,
                    kind: EntityKind::Player,
                    ..
                } => self.entity = Some(*entity),
                Event::TurnStarted { entity, .. } if Some(*entity) == self.entity => {
                    self.begin_turn(world, out);
                }
                Event::ActionChosen { action } => self.choose(*action, world),
                Event::PointerMoved { tile } => self.preview(*tile, world),
                Event::PointerConfirmed { tile: Some(tile) } => self.confirm(*tile, world, out),
                Event::EntitySelected { entity } => self.select(*entity, world),
                Event::ActionCompleted { entity } if Some(*entity) == self.entity => {
                    match self.phase {
                        Phase::Resolving(PlayerAction::Move) => self.finish(out),
                        Phase::Resolving(PlayerAction::Punch) => {
                            self.phase = Phase::Recovering {
                                remaining: self.config.punch_recovery,
                            };
                        }
                        _ => {}
                    }
                }
                Event::ProjectileDetonated { shooter, .. }
                    if Some(*shooter) == self.entity
                        && self.phase == Phase::Resolving(PlayerAction::Shoot) =>
                {
                    self.phase = Phase::Recovering {
                        remaining: self.config.shoot_recovery,
                    };
                }
                Event::ActionRejected { entity, reason } if Some(*entity) == self.entity => {
                    if matches!(self.phase, Phase::Resolving(_)) {
                        log::warn!("player action rejected: {reason:?}");
                        self.phase = Phase::Choosing;
                    }
                }
                Event::EntityWillDie { entity, .. } if Some(*entity) == self.entity => {
                    self.reset();
                }
                Event::LevelCleared | Event::LevelLost => self.reset(),
                Event::TimeAdvanced { dt } => self.advance(*dt, world, out),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Waiting;
        self.highlights = Highlights::default();
    }

    fn origin(&self, world: &World) -> Option<TileCoord> {
        self.entity
            .and_then(|entity| query::entity(world, entity))
            .and_then(|snapshot| snapshot.grounded_tile())
    }

    fn begin_turn(&mut self, world: &World, out: &mut Vec<Command>) {
        if self.origin(world).is_none() {
            log::debug!("player is off the board and skips its turn");
            self.finish(out);
            return;
        }
        self.phase = Phase::Choosing;
        self.highlights = Highlights::default();
    }

    fn choose(&mut self, action: PlayerAction, world: &World) {
        if !matches!(self.phase, Phase::Choosing | Phase::Aiming(_)) {
            return;
        }
        self.highlights = Highlights::default();
        if action == PlayerAction::Cancel || !query::is_unlocked(world, action) {
            log::debug!("player returns to choosing after {action:?}");
            self.phase = Phase::Choosing;
            return;
        }
        let Some(origin) = self.origin(world) else {
            self.phase = Phase::Choosing;
            return;
        };

        self.highlights.targets = match action {
            PlayerAction::Move => query::reachable_tiles(world, origin, self.reach, false),
            PlayerAction::Punch => query::reachable_tiles(world, origin, 1, true)
                .into_iter()
                .filter(|tile| {
                    query::occupant(world, *tile).map_or(false, |occupant| Some(occupant) != self.entity)
                })
                .collect(),
            PlayerAction::Shoot => Direction::ALL
                .into_iter()
                .flat_map(|direction| ray(world, origin, direction))
                .collect(),
            PlayerAction::Cancel => BTreeSet::new(),
        };
        self.phase = Phase::Aiming(action);
        self.preview(query::pointed_tile(world), world);
    }

    fn preview(&mut self, tile: Option<TileCoord>, world: &World) {
        let Phase::Aiming(action) = self.phase else {
            return;
        };
        self.highlights.emphasized.clear();
        let (Some(tile), Some(origin)) = (tile, self.origin(world)) else {
            return;
        };
        if !self.highlights.targets.contains(&tile) {
            return;
        }
        self.highlights.emphasized = match action {
            PlayerAction::Move => query::path(world, origin, tile, false),
            PlayerAction::Shoot => Direction::toward(origin, tile)
                .map(|direction| ray(world, origin, direction))
                .unwrap_or_default(),
            PlayerAction::Punch | PlayerAction::Cancel => vec![tile],
        };
    }

    fn confirm(&mut self, tile: TileCoord, world: &World, out: &mut Vec<Command>) {
        let Phase::Aiming(action) = self.phase else {
            return;
        };
        if !self.highlights.targets.contains(&tile) {
            return;
        }
        let (Some(entity), Some(origin)) = (self.entity, self.origin(world)) else {
            return;
        };

        match action {
            PlayerAction::Move => {
                let path = query::path(world, origin, tile, false);
                if path.is_empty() {
                    log::debug!("no path to {tile:?}");
                    return;
                }
                out.push(Command::MoveAlongPath { entity, path });
                self.commit(Phase::Resolving(PlayerAction::Move));
            }
            PlayerAction::Shoot => {
                if let Some(direction) = Direction::toward(origin, tile) {
                    self.commit(Phase::WindUp {
                        remaining: self.config.shoot_wind_up,
                        strike: Strike::Shoot(direction),
                    });
                }
            }
            PlayerAction::Punch | PlayerAction::Cancel => {}
        }
    }

    fn select(&mut self, entity: EntityId, world: &World) {
        if self.phase != Phase::Aiming(PlayerAction::Punch) || Some(entity) == self.entity {
            return;
        }
        let Some(tile) = query::entity(world, entity).and_then(|snapshot| snapshot.grounded_tile())
        else {
            return;
        };
        if self.highlights.targets.contains(&tile) {
            self.commit(Phase::WindUp {
                remaining: self.config.punch_wind_up,
                strike: Strike::Punch(tile),
            });
        }
    }

    fn commit(&mut self, phase: Phase) {
        self.phase = phase;
        self.highlights = Highlights::default();
    }

    fn advance(&mut self, dt: Duration, world: &World, out: &mut Vec<Command>) {
        match &mut self.phase {
            Phase::WindUp { remaining, strike } => {
                *remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return;
                }
                let strike = *strike;
                let (Some(entity), Some(origin)) = (self.entity, self.origin(world)) else {
                    self.finish(out);
                    return;
                };
                match strike {
                    Strike::Punch(target) => {
                        out.push(Command::Melee {
                            attacker: entity,
                            target,
                            advance: false,
                        });
                        self.phase = Phase::Resolving(PlayerAction::Punch);
                    }
                    Strike::Shoot(direction) => {
                        out.push(Command::FireProjectile {
                            shooter: entity,
                            origin,
                            direction,
                            speed: self.projectile_speed,
                        });
                        self.phase = Phase::Resolving(PlayerAction::Shoot);
                    }
                }
            }
            Phase::Recovering { remaining } => {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.finish(out);
                }
            }
            Phase::Waiting | Phase::Choosing | Phase::Aiming(_) | Phase::Resolving(_) => {}
        }
    }

    fn finish(&mut self, out: &mut Vec<Command>) {
        self.reset();
        if let Some(entity) = self.entity {
            out.push(Command::FinishTurn { entity });
        }
    }
}

impl Default for PlayerControl {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Tiles from `origin` (exclusive) to the grid edge along `direction`.
fn ray(world: &World, origin: TileCoord, direction: Direction) -> Vec<TileCoord> {
    let mut tiles = Vec::new();
    let mut cursor = origin.step(direction);
    while query::tile_anchor(world, cursor).is_some() {
        tiles.push(cursor);
        cursor = cursor.step(direction);
    }
    tiles
}
