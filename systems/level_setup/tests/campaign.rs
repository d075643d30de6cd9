use std::time::Duration;

use hellguard_core::{
    Campaign, Command, EntityId, EntityKind, EntityStats, Event, LevelConfig, LoopStatus,
    ObstacleConfig, TileCoord,
};
use hellguard_system_adversary::{self as adversary, Adversary};
use hellguard_system_level_setup::{Config, LevelSetup};
use hellguard_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(50);

/// World plus the systems that populate it. The player never ends its turn,
/// so once the loop runs the adversary only acts when it is handed the first
/// turn.
struct Harness {
    world: World,
    setup: LevelSetup,
    adversary: Adversary,
    log: Vec<Event>,
}

impl Harness {
    fn new(campaign: Campaign) -> Self {
        Self::with_config(Config::new(17), campaign)
    }

    fn with_config(config: Config, campaign: Campaign) -> Self {
        let mut harness = Self {
            world: World::new(),
            setup: LevelSetup::new(config, campaign),
            adversary: Adversary::new(adversary::Config::new(17)),
            log: Vec::new(),
        };
        let mut commands = Vec::new();
        harness.setup.begin(&mut commands);
        harness.pump(commands);
        harness
    }

    fn submit(&mut self, command: Command) {
        self.pump(vec![command]);
    }

    fn pump(&mut self, mut commands: Vec<Command>) {
        while !commands.is_empty() {
            let mut events = Vec::new();
            for command in std::mem::take(&mut commands) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.setup.handle(&events, &self.world, &mut commands);
            self.adversary.handle(&events, &self.world, &mut commands);
            self.log.extend(events);
        }
    }

    fn tick(&mut self, frames: usize) {
        for _ in 0..frames {
            self.submit(Command::Tick { dt: FRAME });
        }
    }

    /// Ticks through the adversary's stroll until the loop starts.
    fn open_level(&mut self) -> LoopStatus {
        let mark = self.log.len();
        for _ in 0..800 {
            if self.log[mark..]
                .iter()
                .any(|event| matches!(event, Event::LoopStarted { .. }))
            {
                return query::loop_status(&self.world);
            }
            self.tick(1);
        }
        panic!("level never started");
    }

    fn spawn(&mut self, kind: EntityKind, tile: TileCoord, stats: EntityStats) -> EntityId {
        let mark = self.log.len();
        self.submit(Command::SpawnEntity { kind, tile, stats });
        self.log[mark..]
            .iter()
            .find_map(|event| match event {
                Event::EntitySpawned { entity, .. } => Some(*entity),
                _ => None,
            })
            .expect("spawned")
    }

    fn player(&self) -> EntityId {
        query::living(&self.world, EntityKind::Player)
            .first()
            .map(|snapshot| snapshot.id)
            .expect("player alive")
    }

    fn obstacles(&self) -> usize {
        query::living(&self.world, EntityKind::Obstacle).len()
    }

    fn configured_levels(&self) -> usize {
        self.log
            .iter()
            .filter(|event| matches!(event, Event::LevelConfigured { .. }))
            .count()
    }
}

fn tile(x: i32, y: i32) -> TileCoord {
    TileCoord::new(x, y)
}

fn index_of(log: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    log.iter().position(predicate).expect("event logged")
}

fn fragile_ring_level() -> LevelConfig {
    LevelConfig {
        obstacles: ObstacleConfig {
            stats: EntityStats::new(5, 1),
            ring_radii: vec![1],
            minimum: 5,
            hint: true,
        },
        ..LevelConfig::default()
    }
}

/// Spawns an obstacle right outside the adversary's patrol ring and has it
/// strike the adversary.
fn strike_adversary(harness: &mut Harness) {
    let adversary = harness.adversary.entity().expect("adversary spawned");
    let at = query::entity(&harness.world, adversary)
        .and_then(|snapshot| snapshot.grounded_tile())
        .expect("grounded");
    let outward = if (at.x() - 3).abs() == 2 {
        at.offset((at.x() - 3).signum(), 0)
    } else {
        at.offset(0, (at.y() - 3).signum())
    };
    let striker = harness.spawn(EntityKind::Obstacle, outward, EntityStats::new(5, 2));
    harness.submit(Command::Melee {
        attacker: striker,
        target: at,
        advance: false,
    });
}

#[test]
fn tutorial_puts_the_player_in_the_center_and_lets_it_start() {
    let mut harness = Harness::new(Campaign::default());
    let player = harness.player();

    assert_eq!(harness.setup.current_level(), 0);
    assert_eq!(query::occupant(&harness.world, tile(3, 3)), Some(player));
    assert_eq!(harness.obstacles(), 1);
    assert_eq!(query::roster(&harness.world).len(), 2);
    assert!(harness.setup.is_opening());
    assert!(harness.adversary.is_strolling());
    assert_eq!(query::loop_status(&harness.world), LoopStatus::Idle);

    assert_eq!(harness.open_level(), LoopStatus::Running);
    assert!(harness.log.contains(&Event::LoopStarted { first: player }));
    assert_eq!(query::active_entity(&harness.world), Some(player));
    assert!(!harness.adversary.is_strolling());
}

#[test]
fn player_turn_waits_until_the_hint_obstacle_is_destroyed() {
    let mut harness = Harness::new(Campaign {
        levels: vec![fragile_ring_level()],
    });
    let adversary = harness.adversary.entity().expect("adversary spawned");
    let hint_tile = harness
        .adversary
        .patrol()
        .and_then(|patrol| patrol.next_tile(3))
        .expect("route");
    let hint = query::occupant(&harness.world, hint_tile).expect("hint obstacle");

    let _ = harness.open_level();

    let destroyed = index_of(&harness.log, |event| {
        matches!(event, Event::EntityWillDie { entity, .. } if *entity == hint)
    });
    let first_turn = index_of(&harness.log, |event| matches!(event, Event::TurnStarted { .. }));
    let strolled = index_of(&harness.log, |event| {
        matches!(event, Event::EntityStepped { entity, .. } if *entity == adversary)
    });
    assert!(strolled < destroyed);
    assert!(destroyed < first_turn);
    assert_eq!(
        harness.log[first_turn],
        Event::TurnStarted {
            entity: harness.player(),
            kind: EntityKind::Player,
        }
    );
    // The hint does not count toward the replenishment minimum.
    assert_eq!(harness.obstacles(), 4);
}

#[test]
fn sturdy_hint_obstacle_starts_the_level_after_the_opening_timeout() {
    let mut harness = Harness::with_config(
        Config::new(17).with_opening_timeout(Duration::from_secs(2)),
        Campaign {
            levels: vec![LevelConfig {
                obstacles: ObstacleConfig {
                    stats: EntityStats::new(5, 50),
                    ..fragile_ring_level().obstacles
                },
                ..fragile_ring_level()
            }],
        },
    );
    let player = harness.player();

    harness.tick(39);
    assert!(harness.setup.is_opening());
    harness.tick(1);
    assert!(!harness.setup.is_opening());
    assert!(harness.log.contains(&Event::LoopStarted { first: player }));
}

#[test]
fn arena_surrounds_the_player_with_obstacle_rings() {
    let arena = Campaign::default().levels[1].clone();
    let harness = Harness::new(Campaign {
        levels: vec![arena],
    });
    let center = tile(4, 4);

    assert_eq!(query::occupant(&harness.world, center), Some(harness.player()));
    assert_eq!(harness.obstacles(), 8);
    for obstacle in query::living(&harness.world, EntityKind::Obstacle) {
        let at = obstacle.grounded_tile().expect("grounded");
        assert_eq!(at.manhattan_distance(center), 2);
    }
    let adversary = harness.adversary.entity().expect("adversary spawned");
    assert!(harness.log.contains(&Event::LoopStarted { first: adversary }));
}

#[test]
fn destroyed_obstacle_is_replaced_while_the_loop_waits() {
    let mut harness = Harness::new(Campaign {
        levels: vec![fragile_ring_level()],
    });
    // Four ring tiles plus the hint.
    assert_eq!(harness.obstacles(), 5);
    let _ = harness.open_level();
    assert_eq!(harness.obstacles(), 4);

    let striker = harness.spawn(EntityKind::Obstacle, tile(2, 2), EntityStats::new(5, 2));
    assert_eq!(harness.obstacles(), 5);
    let mark = harness.log.len();
    harness.submit(Command::Melee {
        attacker: striker,
        target: tile(3, 2),
        advance: false,
    });

    let dropped: Vec<TileCoord> = harness.log[mark..]
        .iter()
        .filter_map(|event| match event {
            Event::EntitySpawned {
                kind: EntityKind::Obstacle,
                tile,
                ..
            } => Some(*tile),
            _ => None,
        })
        .collect();
    assert_eq!(dropped.len(), 1);
    let drop = dropped[0];
    assert!(drop.x() > 0 && drop.y() > 0 && drop.x() < 6 && drop.y() < 6);
    assert_eq!(harness.obstacles(), 5);
    assert_eq!(query::loop_status(&harness.world), LoopStatus::Paused);

    harness.tick(19);
    assert_eq!(query::loop_status(&harness.world), LoopStatus::Paused);
    harness.tick(1);
    assert_eq!(query::loop_status(&harness.world), LoopStatus::Running);
}

#[test]
fn obstacles_above_the_minimum_are_not_replaced() {
    let mut harness = Harness::new(Campaign {
        levels: vec![LevelConfig {
            obstacles: ObstacleConfig {
                minimum: 4,
                ..fragile_ring_level().obstacles
            },
            ..fragile_ring_level()
        }],
    });
    let _ = harness.open_level();
    let striker = harness.spawn(EntityKind::Obstacle, tile(2, 2), EntityStats::new(5, 2));
    harness.submit(Command::Melee {
        attacker: striker,
        target: tile(3, 2),
        advance: false,
    });

    assert_eq!(harness.obstacles(), 4);
    assert_eq!(query::loop_status(&harness.world), LoopStatus::Running);
}

#[test]
fn lost_level_restarts_after_a_delay() {
    let mut harness = Harness::new(Campaign {
        levels: vec![fragile_ring_level()],
    });
    let first_player = harness.player();
    let attacker = query::occupant(&harness.world, tile(3, 2)).expect("ring obstacle");
    harness.submit(Command::Melee {
        attacker,
        target: tile(3, 3),
        advance: false,
    });
    assert!(harness.log.contains(&Event::LevelLost));
    assert_eq!(harness.configured_levels(), 1);

    harness.tick(40);
    assert_eq!(harness.configured_levels(), 2);
    assert_eq!(harness.setup.current_level(), 0);
    let player = harness.player();
    assert_ne!(player, first_player);
    assert_eq!(query::occupant(&harness.world, tile(3, 3)), Some(player));
    assert!(harness.setup.is_opening());

    let _ = harness.open_level();
    assert_eq!(query::active_entity(&harness.world), Some(player));
}

#[test]
fn cleared_level_advances_to_the_next_one() {
    let fragile = LevelConfig {
        adversary: hellguard_core::AdversaryConfig {
            stats: EntityStats::new(3, 1),
            ..hellguard_core::AdversaryConfig::default()
        },
        obstacles: ObstacleConfig {
            hint: true,
            ..ObstacleConfig::default()
        },
        ..LevelConfig::default()
    };
    let next = Campaign::default().levels[1].clone();
    let mut harness = Harness::new(Campaign {
        levels: vec![fragile, next],
    });

    strike_adversary(&mut harness);
    assert!(harness.log.contains(&Event::LevelCleared));
    assert!(!harness.setup.is_complete());

    harness.tick(40);
    assert_eq!(harness.setup.current_level(), 1);
    assert_eq!(query::grid(&harness.world).size(), 9);
    assert_eq!(harness.obstacles(), 8);
}

#[test]
fn clearing_the_last_level_completes_the_campaign() {
    let fragile = LevelConfig {
        adversary: hellguard_core::AdversaryConfig {
            stats: EntityStats::new(3, 1),
            ..hellguard_core::AdversaryConfig::default()
        },
        obstacles: ObstacleConfig {
            hint: true,
            ..ObstacleConfig::default()
        },
        ..LevelConfig::default()
    };
    let mut harness = Harness::new(Campaign {
        levels: vec![fragile],
    });

    strike_adversary(&mut harness);
    harness.tick(40);

    assert!(harness.setup.is_complete());
    assert_eq!(harness.configured_levels(), 1);
}
