use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EntityKind, EntityStats, PlayerAction};

/// Errors raised while validating level configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The adversary's patrol ring does not fit inside the grid.
    #[error("patrol radius {radius} does not fit inside a {grid_size}x{grid_size} grid")]
    PatrolOutsideGrid {
        /// Requested patrol radius.
        radius: u32,
        /// Normalized grid size.
        grid_size: u32,
    },
    /// A patrol radius of zero yields no route.
    #[error("patrol radius must be positive")]
    EmptyPatrol,
    /// The adversary would never move.
    #[error("adversary movement budget must be positive")]
    NoMovement,
    /// An obstacle ring crosses the patrol route.
    #[error("obstacle ring of radius {radius} crosses the patrol route")]
    ObstacleRingOnPatrol {
        /// Offending ring radius.
        radius: u32,
    },
    /// Projectiles would never reach the next tile.
    #[error("{shooter:?} projectile speed must be a positive number of tiles per second (received {speed})")]
    StalledProjectiles {
        /// Kind of entity firing the projectiles.
        shooter: EntityKind,
        /// Configured speed.
        speed: f32,
    },
    /// A campaign must contain at least one level.
    #[error("campaign contains no levels")]
    EmptyCampaign,
}

/// Static description of a single level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Side length of the square grid. Normalized to an odd value of at least one.
    pub grid_size: u32,
    /// Movement-reach modifier added to the player's base reach.
    pub extra_moves: i32,
    /// Player actions available when the level starts.
    pub allowed_actions: Vec<PlayerAction>,
    /// Player parameters.
    pub player: PlayerConfig,
    /// Adversary parameters.
    pub adversary: AdversaryConfig,
    /// Obstacle placement parameters.
    pub obstacles: ObstacleConfig,
}

/// Parameters describing the player character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Combat statistics.
    pub stats: EntityStats,
    /// Base number of steps the player may walk per turn.
    pub move_reach: u32,
    /// Speed of the player's projectiles in tiles per second.
    pub projectile_speed: f32,
}

/// Parameters describing the adversary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdversaryConfig {
    /// Combat statistics.
    pub stats: EntityStats,
    /// Patrol steps attempted per turn.
    pub movement: u32,
    /// Health at or below which the adversary goes berserk.
    pub berserk_threshold: i32,
    /// Distance of the square patrol ring from the grid center.
    pub patrol_radius: u32,
    /// Speed of the adversary's projectiles in tiles per second.
    pub projectile_speed: f32,
}

/// Parameters describing obstacle placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Combat statistics.
    pub stats: EntityStats,
    /// Manhattan distances from the center filled with obstacles at level start.
    pub ring_radii: Vec<u32>,
    /// Live obstacle count maintained by dropping replacements.
    pub minimum: u32,
    /// Drops a bait obstacle on the patrol route and lets the player act first.
    pub hint: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stats: EntityStats::new(2, 3),
            move_reach: 2,
            projectile_speed: 10.0,
        }
    }
}

impl Default for AdversaryConfig {
    fn default() -> Self {
        Self {
            stats: EntityStats {
                strength: 3,
                health: 4,
                linger_ms: 1_500,
            },
            movement: 3,
            berserk_threshold: 1,
            patrol_radius: 2,
            projectile_speed: 10.0,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            stats: EntityStats {
                strength: 5,
                health: 2,
                linger_ms: 500,
            },
            ring_radii: Vec::new(),
            minimum: 0,
            hint: false,
        }
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            grid_size: 7,
            extra_moves: 0,
            allowed_actions: vec![PlayerAction::Move, PlayerAction::Punch],
            player: PlayerConfig::default(),
            adversary: AdversaryConfig::default(),
            obstacles: ObstacleConfig::default(),
        }
    }
}

impl LevelConfig {
    /// Grid size rounded up to the next odd value, never below one.
    #[must_use]
    pub fn normalized_grid_size(&self) -> u32 {
        let size = self.grid_size.max(1);
        if size % 2 == 0 {
            size + 1
        } else {
            size
        }
    }

    /// Number of steps the player may walk per turn on this level.
    #[must_use]
    pub fn player_reach(&self) -> i32 {
        self.player.move_reach as i32 + self.extra_moves
    }

    /// Normalizes the configuration and checks that the level can be played.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.grid_size = self.normalized_grid_size();
        let radius = self.adversary.patrol_radius;
        if radius == 0 {
            return Err(ConfigError::EmptyPatrol);
        }
        if radius > self.grid_size / 2 {
            return Err(ConfigError::PatrolOutsideGrid {
                radius,
                grid_size: self.grid_size,
            });
        }
        if self.adversary.movement == 0 {
            return Err(ConfigError::NoMovement);
        }
        if let Some(ring) = self
            .obstacles
            .ring_radii
            .iter()
            .copied()
            .find(|ring| (radius..=2 * radius).contains(ring))
        {
            return Err(ConfigError::ObstacleRingOnPatrol { radius: ring });
        }
        for (shooter, speed) in [
            (EntityKind::Player, self.player.projectile_speed),
            (EntityKind::Adversary, self.adversary.projectile_speed),
        ] {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::StalledProjectiles { shooter, speed });
            }
        }
        Ok(self)
    }
}

/// Ordered list of levels played in sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Levels in play order.
    pub levels: Vec<LevelConfig>,
}

impl Default for Campaign {
    fn default() -> Self {
        let tutorial = LevelConfig {
            obstacles: ObstacleConfig {
                hint: true,
                ..ObstacleConfig::default()
            },
            ..LevelConfig::default()
        };
        let arena = LevelConfig {
            grid_size: 9,
            extra_moves: 1,
            adversary: AdversaryConfig {
                patrol_radius: 3,
                ..AdversaryConfig::default()
            },
            obstacles: ObstacleConfig {
                ring_radii: vec![2],
                minimum: 4,
                ..ObstacleConfig::default()
            },
            ..LevelConfig::default()
        };
        Self {
            levels: vec![tutorial, arena],
        }
    }
}

impl Campaign {
    /// Validates every level, returning the normalized campaign.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::EmptyCampaign);
        }
        let levels = self
            .levels
            .into_iter()
            .map(LevelConfig::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_is_normalized_to_odd() {
        let sized = |grid_size| LevelConfig {
            grid_size,
            ..LevelConfig::default()
        };
        assert_eq!(sized(0).normalized_grid_size(), 1);
        assert_eq!(sized(1).normalized_grid_size(), 1);
        assert_eq!(sized(6).normalized_grid_size(), 7);
        assert_eq!(sized(9).normalized_grid_size(), 9);
    }

    #[test]
    fn validation_rejects_patrol_outside_grid() {
        let level = LevelConfig {
            grid_size: 5,
            adversary: AdversaryConfig {
                patrol_radius: 3,
                ..AdversaryConfig::default()
            },
            ..LevelConfig::default()
        };
        assert_eq!(
            level.validate(),
            Err(ConfigError::PatrolOutsideGrid {
                radius: 3,
                grid_size: 5
            })
        );
    }

    #[test]
    fn validation_rejects_rings_crossing_the_route() {
        let level = LevelConfig {
            obstacles: ObstacleConfig {
                ring_radii: vec![1, 3],
                ..ObstacleConfig::default()
            },
            ..LevelConfig::default()
        };
        assert_eq!(
            level.validate(),
            Err(ConfigError::ObstacleRingOnPatrol { radius: 3 })
        );
    }

    #[test]
    fn validation_rejects_projectiles_that_never_move() {
        let still = LevelConfig {
            player: PlayerConfig {
                projectile_speed: 0.0,
                ..PlayerConfig::default()
            },
            ..LevelConfig::default()
        };
        assert_eq!(
            still.validate(),
            Err(ConfigError::StalledProjectiles {
                shooter: EntityKind::Player,
                speed: 0.0
            })
        );

        let backwards = LevelConfig {
            adversary: AdversaryConfig {
                projectile_speed: -4.0,
                ..AdversaryConfig::default()
            },
            ..LevelConfig::default()
        };
        let error = backwards.validate().expect_err("negative speed");
        assert_eq!(
            error.to_string(),
            "Adversary projectile speed must be a positive number of tiles per second (received -4)"
        );
    }

    #[test]
    fn default_campaign_is_valid() {
        let campaign = Campaign::default().validate().expect("default campaign");
        assert_eq!(campaign.levels.len(), 2);
        assert!(campaign.levels[0].obstacles.hint);
        assert_eq!(campaign.levels[1].player_reach(), 3);
    }

    #[test]
    fn level_config_survives_binary_encoding() {
        let level = Campaign::default().levels.remove(1);
        let bytes = bincode::serialize(&level).expect("encode level");
        let decoded: LevelConfig = bincode::deserialize(&bytes).expect("decode level");
        assert_eq!(decoded, level);
    }
}
