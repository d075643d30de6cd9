#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation contracts for Hellguard adapters.
//!
//! The simulation only needs before and after states. Adapters that animate
//! the board implement [`PresentationDriver`]; the [`Choreographer`] turns the
//! world's event stream into tween requests and effect cues for them.

use std::{collections::BTreeMap, error::Error, fmt, time::Duration};

use anyhow::Result as AnyResult;
use glam::Vec3;
use hellguard_core::{
    Direction, EntityId, EntityKind, Event, PlayerAction, ProjectileId, TileCoord,
};
use hellguard_world::{query, World};

/// One-shot effects the presentation layer may play (sounds, shakes, flashes).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cue {
    /// An entity appeared on the board.
    Spawned {
        /// Entity that appeared.
        entity: EntityId,
        /// Category of the entity.
        kind: EntityKind,
    },
    /// An entity lost health.
    Hurt {
        /// Entity that was hurt.
        entity: EntityId,
        /// Health left after the hit.
        health: i32,
    },
    /// An entity's health ran out and it starts fading.
    Dying {
        /// Dying entity.
        entity: EntityId,
    },
    /// An entity left the board.
    Removed {
        /// Removed entity.
        entity: EntityId,
    },
    /// A thrown entity hit the ground.
    Impact {
        /// Entity that landed.
        entity: EntityId,
        /// Anchor of the landing tile.
        at: Vec3,
    },
    /// A thrown entity left the board and hangs over its last tile.
    Stranded {
        /// Stranded entity.
        entity: EntityId,
    },
    /// A projectile left its shooter.
    Launched {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Anchor of the origin tile.
        at: Vec3,
        /// Travel direction.
        direction: Direction,
    },
    /// A projectile head entered a tile.
    Travelled {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Anchor of the entered tile.
        at: Vec3,
    },
    /// A projectile exploded, on a tile or past the board edge.
    Explosion {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Anchor of the tile, `None` when it left the board.
        at: Option<Vec3>,
    },
    /// A leap touched down and shook its surroundings.
    Shockwave {
        /// Anchor of the landing tile.
        at: Vec3,
    },
    /// A player action became available.
    Unlocked {
        /// Newly available action.
        action: PlayerAction,
    },
    /// The adversary fell.
    Victory,
    /// The player fell.
    Defeat,
}

/// Adapter capable of animating the board.
pub trait PresentationDriver {
    /// Moves the entity's visual to `target` over `duration`. A zero duration
    /// places it immediately.
    fn tween_entity(&mut self, entity: EntityId, target: Vec3, duration: Duration) -> AnyResult<()>;

    /// Plays a one-shot effect.
    fn cue(&mut self, cue: Cue) -> AnyResult<()>;
}

/// Errors raised while translating events into presentation requests.
#[derive(Debug, PartialEq, Eq)]
pub enum PresentationError {
    /// An event referenced a tile that the current grid does not contain.
    MissingAnchor {
        /// Tile without an anchor.
        tile: TileCoord,
    },
}

impl fmt::Display for PresentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAnchor { tile } => {
                write!(f, "tile ({}, {}) has no anchor on this grid", tile.x(), tile.y())
            }
        }
    }
}

impl Error for PresentationError {}

/// Translates world events into driver calls and remembers where every
/// entity was last sent.
#[derive(Debug, Default)]
pub struct Choreographer {
    positions: BTreeMap<EntityId, Vec3>,
}

impl Choreographer {
    /// Creates a choreographer with no tracked entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visual position last requested for the entity.
    #[must_use]
    pub fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }

    /// Forwards the presentation of an event batch to the driver.
    pub fn present<D>(&mut self, events: &[Event], world: &World, driver: &mut D) -> AnyResult<()>
    where
        D: PresentationDriver + ?Sized,
    {
        let timings = *query::timings(world);
        for event in events {
            match event {
                Event::LevelConfigured { .. } => self.positions.clear(),
                Event::EntitySpawned { entity, kind, tile } => {
                    self.tween(*entity, anchor(world, *tile)?, Duration::ZERO, driver)?;
                    driver.cue(Cue::Spawned {
                        entity: *entity,
                        kind: *kind,
                    })?;
                }
                Event::EntityStepped { entity, tile } => {
                    self.tween(*entity, anchor(world, *tile)?, timings.step_duration, driver)?;
                }
                Event::EntityMoved { entity, to, .. } => {
                    self.tween(*entity, anchor(world, *to)?, timings.step_duration, driver)?;
                }
                Event::EntityThrown {
                    entity,
                    from,
                    to: Some(to),
                } => {
                    let distance = from.manhattan_distance(*to).max(1) as f32;
                    let duration = flight_time(distance, timings.throw_speed);
                    self.tween(*entity, anchor(world, *to)?, duration, driver)?;
                }
                Event::EntityLanded { entity, tile } => {
                    let at = anchor(world, *tile)?;
                    self.tween(*entity, at, Duration::ZERO, driver)?;
                    driver.cue(Cue::Impact {
                        entity: *entity,
                        at,
                    })?;
                }
                Event::EntityStranded { entity, .. } => driver.cue(Cue::Stranded { entity: *entity })?,
                Event::EntityLeapt { entity, to, .. } => {
                    let at = anchor(world, *to)?;
                    self.tween(*entity, at, Duration::ZERO, driver)?;
                    driver.cue(Cue::Shockwave { at })?;
                }
                Event::EntityDamaged { entity, health, .. } => driver.cue(Cue::Hurt {
                    entity: *entity,
                    health: *health,
                })?,
                Event::EntityWillDie { entity, .. } => driver.cue(Cue::Dying { entity: *entity })?,
                Event::EntityDespawned { entity } => {
                    let _ = self.positions.remove(entity);
                    driver.cue(Cue::Removed { entity: *entity })?;
                }
                Event::ProjectileLaunched {
                    projectile,
                    origin,
                    direction,
                    ..
                } => driver.cue(Cue::Launched {
                    projectile: *projectile,
                    at: anchor(world, *origin)?,
                    direction: *direction,
                })?,
                Event::ProjectileAdvanced { projectile, tile } => driver.cue(Cue::Travelled {
                    projectile: *projectile,
                    at: anchor(world, *tile)?,
                })?,
                Event::ProjectileDetonated {
                    projectile, tile, ..
                } => {
                    let at = tile.map(|tile| anchor(world, tile)).transpose()?;
                    driver.cue(Cue::Explosion {
                        projectile: *projectile,
                        at,
                    })?;
                }
                Event::ActionUnlocked { action } => driver.cue(Cue::Unlocked { action: *action })?,
                Event::LevelCleared => driver.cue(Cue::Victory)?,
                Event::LevelLost => driver.cue(Cue::Defeat)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn tween<D>(&mut self, entity: EntityId, target: Vec3, duration: Duration, driver: &mut D) -> AnyResult<()>
    where
        D: PresentationDriver + ?Sized,
    {
        let _ = self.positions.insert(entity, target);
        driver.tween_entity(entity, target, duration)
    }
}

fn anchor(world: &World, tile: TileCoord) -> Result<Vec3, PresentationError> {
    query::tile_anchor(world, tile).ok_or(PresentationError::MissingAnchor { tile })
}

/// Tween length for `distance` tiles at `speed`; unrepresentable times collapse to zero.
fn flight_time(distance: f32, speed: f32) -> Duration {
    if speed <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(distance / speed).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellguard_core::{Command, EntityStats, LevelConfig};
    use hellguard_world::{self as world, Timings};

    #[derive(Default)]
    struct Recorder {
        tweens: Vec<(EntityId, Vec3, Duration)>,
        cues: Vec<Cue>,
    }

    impl PresentationDriver for Recorder {
        fn tween_entity(&mut self, entity: EntityId, target: Vec3, duration: Duration) -> AnyResult<()> {
            self.tweens.push((entity, target, duration));
            Ok(())
        }

        fn cue(&mut self, cue: Cue) -> AnyResult<()> {
            self.cues.push(cue);
            Ok(())
        }
    }

    struct Broken;

    impl PresentationDriver for Broken {
        fn tween_entity(&mut self, _: EntityId, _: Vec3, _: Duration) -> AnyResult<()> {
            anyhow::bail!("display lost")
        }

        fn cue(&mut self, _: Cue) -> AnyResult<()> {
            Ok(())
        }
    }

    fn configured() -> (World, Vec<Event>) {
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureLevel {
                level: LevelConfig::default(),
            },
            &mut events,
        );
        (world, events)
    }

    fn spawn(world: &mut World, kind: EntityKind, tile: TileCoord) -> (EntityId, Vec<Event>) {
        let mut events = Vec::new();
        world::apply(
            world,
            Command::SpawnEntity {
                kind,
                tile,
                stats: EntityStats::new(2, 3),
            },
            &mut events,
        );
        let entity = events
            .iter()
            .find_map(|event| match event {
                Event::EntitySpawned { entity, .. } => Some(*entity),
                _ => None,
            })
            .expect("spawned");
        (entity, events)
    }

    #[test]
    fn spawns_are_placed_without_a_tween() {
        let (mut world, _) = configured();
        let tile = TileCoord::new(2, 4);
        let (entity, events) = spawn(&mut world, EntityKind::Player, tile);
        let mut choreographer = Choreographer::new();
        let mut recorder = Recorder::default();

        choreographer
            .present(&events, &world, &mut recorder)
            .expect("presented");

        let at = query::tile_anchor(&world, tile).expect("anchor");
        assert_eq!(recorder.tweens, vec![(entity, at, Duration::ZERO)]);
        assert_eq!(
            recorder.cues,
            vec![Cue::Spawned {
                entity,
                kind: EntityKind::Player,
            }]
        );
        assert_eq!(choreographer.position(entity), Some(at));
    }

    #[test]
    fn steps_tween_over_the_step_duration() {
        let (mut world, _) = configured();
        let (entity, _) = spawn(&mut world, EntityKind::Player, TileCoord::new(3, 3));
        let mut choreographer = Choreographer::new();
        let mut recorder = Recorder::default();
        let step = query::timings(&world).step_duration;

        let stepped = [Event::EntityStepped {
            entity,
            tile: TileCoord::new(3, 2),
        }];
        choreographer
            .present(&stepped, &world, &mut recorder)
            .expect("presented");

        let at = query::tile_anchor(&world, TileCoord::new(3, 2)).expect("anchor");
        assert_eq!(recorder.tweens, vec![(entity, at, step)]);
    }

    #[test]
    fn throws_at_unusable_speeds_snap_to_the_landing_tile() {
        for throw_speed in [0.0, -3.0, f32::MIN_POSITIVE, f32::NAN] {
            let mut world = World::with_timings(Timings {
                throw_speed,
                ..Timings::default()
            });
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::ConfigureLevel {
                    level: LevelConfig::default(),
                },
                &mut events,
            );
            let (entity, _) = spawn(&mut world, EntityKind::Obstacle, TileCoord::new(3, 3));
            let thrown = [Event::EntityThrown {
                entity,
                from: TileCoord::new(3, 3),
                to: Some(TileCoord::new(3, 4)),
            }];
            let mut recorder = Recorder::default();

            Choreographer::new()
                .present(&thrown, &world, &mut recorder)
                .expect("presented");

            let at = query::tile_anchor(&world, TileCoord::new(3, 4)).expect("anchor");
            assert_eq!(recorder.tweens, vec![(entity, at, Duration::ZERO)]);
        }
    }

    #[test]
    fn off_grid_detonations_have_no_anchor() {
        let (world, _) = configured();
        let mut recorder = Recorder::default();
        let projectile = ProjectileId::new(0);
        let detonated = [Event::ProjectileDetonated {
            projectile,
            shooter: EntityId::new(0),
            tile: None,
            struck: None,
        }];

        Choreographer::new()
            .present(&detonated, &world, &mut recorder)
            .expect("presented");

        assert_eq!(recorder.cues, vec![Cue::Explosion { projectile, at: None }]);
    }

    #[test]
    fn tiles_outside_the_grid_are_reported() {
        let (world, _) = configured();
        let outside = TileCoord::new(9, 9);
        let events = [Event::EntityStepped {
            entity: EntityId::new(0),
            tile: outside,
        }];

        let error = Choreographer::new()
            .present(&events, &world, &mut Recorder::default())
            .expect_err("no anchor");

        assert_eq!(
            error.downcast_ref::<PresentationError>(),
            Some(&PresentationError::MissingAnchor { tile: outside })
        );
        assert_eq!(
            PresentationError::MissingAnchor { tile: outside }.to_string(),
            "tile (9, 9) has no anchor on this grid"
        );
    }

    #[test]
    fn driver_failures_propagate() {
        let (mut world, _) = configured();
        let (_, events) = spawn(&mut world, EntityKind::Obstacle, TileCoord::new(1, 1));

        let error = Choreographer::new()
            .present(&events, &world, &mut Broken)
            .expect_err("driver failed");

        assert_eq!(error.to_string(), "display lost");
    }
}
