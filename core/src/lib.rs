#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared vocabulary of a Hellguard match.
//!
//! Every change to the board is requested as a [`Command`] and reported back
//! as a list of [`Event`]s. Board geometry lives in [`TileCoord`] and
//! [`Direction`], combatants are described by [`EntityKind`] and
//! [`EntityStats`], and level files deserialize into [`LevelConfig`] and
//! [`Campaign`]. The world, the turn systems and the presentation layer all
//! speak in these types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod config;

pub use config::{
    AdversaryConfig, Campaign, ConfigError, LevelConfig, ObstacleConfig, PlayerConfig,
};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the tile grid for a new level, discarding every entity.
    ConfigureLevel {
        /// Static description of the level being started.
        level: LevelConfig,
    },
    /// Requests that a new entity be placed on the provided tile.
    SpawnEntity {
        /// Category of entity to create.
        kind: EntityKind,
        /// Tile the entity should occupy once spawned.
        tile: TileCoord,
        /// Combat statistics assigned to the entity.
        stats: EntityStats,
    },
    /// Requests immediate removal of an entity from the world.
    DespawnEntity {
        /// Identifier of the entity to remove.
        entity: EntityId,
    },
    /// Selects which roster member acts first once the loop starts.
    SetStartingEntity {
        /// Entity that should receive the first turn.
        entity: EntityId,
    },
    /// Starts cycling turns through the roster.
    StartLoop,
    /// Suspends turn handoff without losing the roster position.
    PauseLoop,
    /// Resumes turn handoff after a pause.
    ResumeLoop,
    /// Signals that the provided entity completed its turn.
    FinishTurn {
        /// Entity reporting completion. Ignored unless it is the active entity.
        entity: EntityId,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Updates the tile currently under the input pointer.
    PointAt {
        /// Tile under the pointer, or `None` when the pointer left the board.
        tile: Option<TileCoord>,
    },
    /// Forwards a discrete action choice from the input source.
    ChooseAction {
        /// Action picked by the player.
        action: PlayerAction,
    },
    /// Forwards an entity selection from the input source.
    SelectEntity {
        /// Entity the player clicked on.
        entity: EntityId,
    },
    /// Confirms the tile currently under the pointer.
    ConfirmPointer,
    /// Walks an entity along a precomputed path.
    MoveAlongPath {
        /// Entity that should walk.
        entity: EntityId,
        /// Tiles to transit, excluding the entity's current tile.
        path: Vec<TileCoord>,
    },
    /// Resolves a melee strike against an adjacent tile.
    Melee {
        /// Entity delivering the strike.
        attacker: EntityId,
        /// Tile holding the struck entity.
        target: TileCoord,
        /// Whether the attacker steps into the struck tile once it is free.
        advance: bool,
    },
    /// Launches a projectile along a cardinal ray.
    FireProjectile {
        /// Entity credited with the shot.
        shooter: EntityId,
        /// Tile the projectile starts from.
        origin: TileCoord,
        /// Direction the projectile travels.
        direction: Direction,
        /// Travel speed expressed in tiles per second.
        speed: f32,
    },
    /// Leaps an entity onto a destination tile, striking everything around it.
    Leap {
        /// Entity performing the leap.
        entity: EntityId,
        /// Tile the entity lands on.
        destination: TileCoord,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a new level grid was built.
    LevelConfigured {
        /// Normalized configuration of the level.
        level: LevelConfig,
        /// Center tile of the freshly built grid.
        center: TileCoord,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Category of the entity.
        kind: EntityKind,
        /// Tile the entity occupies.
        tile: TileCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Category of the entity that failed to spawn.
        kind: EntityKind,
        /// Tile requested for the spawn.
        tile: TileCoord,
        /// Reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that an entity left the world.
    EntityDespawned {
        /// Identifier of the removed entity.
        entity: EntityId,
    },
    /// Announces that the turn loop started cycling.
    LoopStarted {
        /// Entity receiving the first turn.
        first: EntityId,
    },
    /// Announces that an entity received control of the turn.
    TurnStarted {
        /// Entity whose turn started.
        entity: EntityId,
        /// Category of the active entity.
        kind: EntityKind,
    },
    /// Confirms that the active entity completed its turn.
    TurnFinished {
        /// Entity that relinquished control.
        entity: EntityId,
    },
    /// Reports that the tile under the pointer changed.
    PointerMoved {
        /// Tile under the pointer, if any.
        tile: Option<TileCoord>,
    },
    /// Reports a discrete action choice made through the input source.
    ActionChosen {
        /// Chosen action.
        action: PlayerAction,
    },
    /// Reports that an entity was selected through the input source.
    EntitySelected {
        /// Selected entity.
        entity: EntityId,
    },
    /// Reports that the pointed tile was confirmed.
    PointerConfirmed {
        /// Tile under the pointer at confirmation time.
        tile: Option<TileCoord>,
    },
    /// Announces that a player action became available.
    ActionUnlocked {
        /// Newly available action.
        action: PlayerAction,
    },
    /// Reports that a walking entity transited a tile.
    EntityStepped {
        /// Walking entity.
        entity: EntityId,
        /// Tile reached by the step.
        tile: TileCoord,
    },
    /// Confirms that an entity changed its occupied tile.
    EntityMoved {
        /// Entity that moved.
        entity: EntityId,
        /// Tile the entity vacated.
        from: TileCoord,
        /// Tile the entity now occupies.
        to: TileCoord,
    },
    /// Signals that the top-level action issued for an entity has resolved.
    ActionCompleted {
        /// Entity whose action resolved.
        entity: EntityId,
    },
    /// Reports that an action command was rejected.
    ActionRejected {
        /// Entity the command referred to.
        entity: EntityId,
        /// Reason the action failed.
        reason: ActionError,
    },
    /// Reports that an entity lost health.
    EntityDamaged {
        /// Entity that was hurt.
        entity: EntityId,
        /// Health removed by the hit.
        amount: u32,
        /// Health remaining after the hit.
        health: i32,
    },
    /// Reports that an entity is about to die.
    EntityWillDie {
        /// Entity whose health was exhausted.
        entity: EntityId,
        /// Category of the dying entity.
        kind: EntityKind,
        /// Tile the entity was last associated with.
        tile: Option<TileCoord>,
    },
    /// Reports that an entity was knocked into the air.
    EntityThrown {
        /// Entity in flight.
        entity: EntityId,
        /// Tile the entity was launched from.
        from: TileCoord,
        /// Landing tile, or `None` when the throw leaves the grid.
        to: Option<TileCoord>,
    },
    /// Confirms that a thrown entity occupied its landing tile.
    EntityLanded {
        /// Entity that landed.
        entity: EntityId,
        /// Tile the entity now occupies.
        tile: TileCoord,
    },
    /// Reports that a thrown entity will never occupy a tile again.
    EntityStranded {
        /// Stranded entity.
        entity: EntityId,
        /// Last tile the entity was associated with.
        tile: TileCoord,
    },
    /// Confirms that a projectile started travelling.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Entity credited with the shot.
        shooter: EntityId,
        /// Tile the projectile starts from.
        origin: TileCoord,
        /// Travel direction.
        direction: Direction,
    },
    /// Reports that a projectile head entered a new tile.
    ProjectileAdvanced {
        /// Travelling projectile.
        projectile: ProjectileId,
        /// Tile now holding the projectile head.
        tile: TileCoord,
    },
    /// Reports that a projectile exploded.
    ProjectileDetonated {
        /// Projectile that exploded.
        projectile: ProjectileId,
        /// Entity credited with the shot.
        shooter: EntityId,
        /// Tile of the explosion, or `None` when the ray left the grid.
        tile: Option<TileCoord>,
        /// Entity hit by the explosion, if any.
        struck: Option<EntityId>,
    },
    /// Confirms that a leaping entity landed.
    EntityLeapt {
        /// Entity that leapt.
        entity: EntityId,
        /// Tile the entity left.
        from: TileCoord,
        /// Tile the entity landed on.
        to: TileCoord,
    },
    /// Announces that every adversary on the level has been defeated.
    LevelCleared,
    /// Announces that the player has been defeated.
    LevelLost,
}

/// Unique identifier assigned to an entity.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Integer grid coordinates of a tile.
///
/// Coordinates are signed so that reflections across a tile can be expressed
/// before bounds are checked; tiles themselves only exist at non-negative
/// coordinates inside the configured grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a coordinate from its column and row.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Coordinate displaced by the provided offsets.
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Neighboring coordinate one step along `direction`.
    #[must_use]
    pub const fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Coordinate reached when pushed away from `source` by the same offset.
    ///
    /// A tile struck from an adjacent tile lands exactly one tile further on
    /// the same line: `self + (self - source)`.
    #[must_use]
    pub const fn reflect_from(&self, source: TileCoord) -> Self {
        Self::new(2 * self.x - source.x, 2 * self.y - source.y)
    }

    /// Manhattan distance between two coordinates.
    #[must_use]
    pub const fn manhattan_distance(&self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Whether both coordinates share a column or a row.
    #[must_use]
    pub const fn is_aligned_with(&self, other: TileCoord) -> bool {
        self.x == other.x || self.y == other.y
    }
}

/// Cardinal directions, listed clockwise starting from north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing rows.
    North,
    /// Toward increasing columns.
    East,
    /// Toward increasing rows.
    South,
    /// Toward decreasing columns.
    West,
}

impl Direction {
    /// All directions in clockwise order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row offsets for a single step.
    #[must_use]
    pub const fn delta(&self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Position of the direction inside [`Direction::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Direction at `index` modulo four.
    #[must_use]
    pub fn from_index(index: i64) -> Self {
        Self::ALL[index.rem_euclid(4) as usize]
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Whether the direction runs along the column axis.
    #[must_use]
    pub const fn is_horizontal(&self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Cardinal direction along the dominant axis from `from` toward `to`.
    ///
    /// Returns `None` when both coordinates coincide or when the horizontal
    /// and vertical distances tie, leaving the caller to break the tie.
    #[must_use]
    pub fn toward(from: TileCoord, to: TileCoord) -> Option<Self> {
        let dx = to.x() - from.x();
        let dy = to.y() - from.y();
        if dx.abs() == dy.abs() {
            return None;
        }
        if dx.abs() > dy.abs() {
            Some(Self::horizontal(dx))
        } else {
            Some(Self::vertical(dy))
        }
    }

    /// East for positive offsets, west otherwise.
    #[must_use]
    pub const fn horizontal(dx: i32) -> Self {
        if dx > 0 {
            Self::East
        } else {
            Self::West
        }
    }

    /// South for positive offsets, north otherwise.
    #[must_use]
    pub const fn vertical(dy: i32) -> Self {
        if dy > 0 {
            Self::South
        } else {
            Self::North
        }
    }
}

/// Categories of entities that may occupy tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Character steered through the input source.
    Player,
    /// Character steered by the adversary decision engine.
    Adversary,
    /// Inert boulder that can be shoved and thrown.
    Obstacle,
}

impl EntityKind {
    /// Whether entities of this kind take turns in the roster.
    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(self, Self::Player | Self::Adversary)
    }

    /// Whether a player's blow shoves entities of this kind instead of hurting them.
    #[must_use]
    pub const fn is_throwable_by_shove(&self) -> bool {
        matches!(self, Self::Obstacle)
    }
}

/// Discrete action choices offered to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Abandons the action being prepared.
    Cancel,
    /// Walks to a reachable tile.
    Move,
    /// Strikes an adjacent entity.
    Punch,
    /// Fires a projectile along a cardinal ray.
    Shoot,
}

/// Combat statistics assigned to an entity when it spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityStats {
    /// Attack power, also subtracted from incoming attacks.
    pub strength: u32,
    /// Maximum and starting health.
    pub health: i32,
    /// Milliseconds a defeated entity remains visible before despawning.
    #[serde(default)]
    pub linger_ms: u64,
}

impl EntityStats {
    /// Creates statistics without a death linger.
    #[must_use]
    pub const fn new(strength: u32, health: i32) -> Self {
        Self {
            strength,
            health,
            linger_ms: 0,
        }
    }

    /// Returns the statistics with the provided death linger.
    #[must_use]
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger_ms = u64::try_from(linger.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Death linger expressed as a duration.
    #[must_use]
    pub const fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

/// Health removed when `attack` strikes an entity with `defense` strength.
///
/// Every hit removes at least one point of health, regardless of defense.
#[must_use]
pub const fn damage_dealt(attack: u32, defense: u32) -> u32 {
    let raw = attack.saturating_sub(defense);
    if raw == 0 {
        1
    } else {
        raw
    }
}

/// Read-only snapshot describing a single entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Category of the entity.
    pub kind: EntityKind,
    /// Tile the entity is associated with. Stale while thrown or stranded.
    pub tile: Option<TileCoord>,
    /// Attack power.
    pub strength: u32,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Whether the entity is in flight or stranded after a throw.
    pub being_thrown: bool,
    /// Whether the entity's health has been exhausted.
    pub dead: bool,
}

impl EntitySnapshot {
    /// Tile the entity currently owns, if it is grounded and alive.
    #[must_use]
    pub fn grounded_tile(&self) -> Option<TileCoord> {
        if self.being_thrown || self.dead {
            None
        } else {
            self.tile
        }
    }
}

/// Observable state of the turn loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStatus {
    /// No loop is running.
    Idle,
    /// Turns are being handed off.
    Running,
    /// The loop is suspended and will resume from the same roster position.
    Paused,
}

/// Reasons a spawn request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnError {
    /// No level has been configured yet.
    NoLevel,
    /// The requested tile lies outside the grid.
    OutOfBounds,
    /// The requested tile already holds an entity.
    Occupied,
}

/// Reasons an action command may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionError {
    /// The referenced entity does not exist or has died.
    UnknownEntity,
    /// The entity is in flight, stranded, or otherwise off the board.
    NotGrounded,
    /// A referenced tile lies outside the grid.
    OutOfBounds,
    /// A walk was requested with no tiles to transit.
    EmptyPath,
    /// The targeted tile holds no other entity.
    NoTarget,
    /// The targeted tile is not adjacent to the attacker.
    OutOfReach,
}

/// Read-only view over the dense occupancy of a square grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<EntityId>],
    size: u32,
}

impl<'a> OccupancyView<'a> {
    /// Creates a new occupancy view from a row-major slice of `size * size` cells.
    #[must_use]
    pub fn new(cells: &'a [Option<EntityId>], size: u32) -> Self {
        debug_assert_eq!(cells.len(), (size * size) as usize);
        Self { cells, size }
    }

    /// Side length of the square grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Whether the coordinate lies inside the grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Entity occupying the coordinate, if any.
    #[must_use]
    pub fn occupant(&self, coord: TileCoord) -> Option<EntityId> {
        self.index(coord).and_then(|index| self.cells[index])
    }

    /// Whether the coordinate lies inside the grid and holds no entity.
    #[must_use]
    pub fn is_free(&self, coord: TileCoord) -> bool {
        self.index(coord)
            .map(|index| self.cells[index].is_none())
            .unwrap_or(false)
    }

    /// In-grid orthogonal neighbors ordered left, up, right, down.
    pub fn neighbors(&self, coord: TileCoord) -> impl Iterator<Item = TileCoord> + '_ {
        [(-1, 0), (0, 1), (1, 0), (0, -1)]
            .into_iter()
            .map(move |(dx, dy)| coord.offset(dx, dy))
            .filter(move |neighbor| self.contains(*neighbor))
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        let size = self.size as i32;
        if coord.x() < 0 || coord.y() < 0 || coord.x() >= size || coord.y() >= size {
            return None;
        }
        Some((coord.x() + coord.y() * size) as usize)
    }
}
