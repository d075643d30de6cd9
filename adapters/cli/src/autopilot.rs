//! Scripted stand-in for a human player.

use hellguard_core::{Command, EntityKind, EntitySnapshot, PlayerAction, TileCoord};
use hellguard_system_player_control::{PlayerControl, Stage};
use hellguard_world::{query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Closes in on the adversary, punches it when adjacent and shoots it once
/// shooting is unlocked and it stands in line.
#[derive(Debug)]
pub(crate) struct Autopilot {
    rng: ChaCha8Rng,
}

impl Autopilot {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Emits at most one input step for the current frame.
    pub(crate) fn decide(&mut self, world: &World, control: &PlayerControl, out: &mut Vec<Command>) {
        let Some(player) = control.entity() else {
            return;
        };
        if query::active_entity(world) != Some(player) {
            return;
        }
        let Some(origin) = query::entity(world, player).and_then(|snapshot| snapshot.grounded_tile())
        else {
            return;
        };
        let prey = query::living(world, EntityKind::Adversary)
            .into_iter()
            .find(|snapshot| snapshot.grounded_tile().is_some());
        let prey_tile = prey.as_ref().and_then(EntitySnapshot::grounded_tile);

        match control.stage() {
            Stage::Choosing => {
                let action = match prey_tile {
                    Some(tile)
                        if query::is_unlocked(world, PlayerAction::Shoot)
                            && in_line(origin, tile) =>
                    {
                        PlayerAction::Shoot
                    }
                    Some(tile) if origin.manhattan_distance(tile) == 1 => PlayerAction::Punch,
                    _ => PlayerAction::Move,
                };
                out.push(Command::ChooseAction { action });
            }
            Stage::Aiming(PlayerAction::Move) => {
                let goal = prey_tile.unwrap_or(origin);
                let targets = &control.highlights().targets;
                let Some(best) = targets.iter().map(|tile| tile.manhattan_distance(goal)).min() else {
                    log::debug!("autopilot has nowhere to go and passes");
                    out.push(Command::ChooseAction {
                        action: PlayerAction::Cancel,
                    });
                    out.push(Command::FinishTurn { entity: player });
                    return;
                };
                let options: Vec<TileCoord> = targets
                    .iter()
                    .copied()
                    .filter(|tile| tile.manhattan_distance(goal) == best)
                    .collect();
                let tile = options[self.rng.gen_range(0..options.len())];
                out.push(Command::PointAt { tile: Some(tile) });
                out.push(Command::ConfirmPointer);
            }
            Stage::Aiming(PlayerAction::Punch) => match prey {
                Some(snapshot) => out.push(Command::SelectEntity {
                    entity: snapshot.id,
                }),
                None => out.push(Command::ChooseAction {
                    action: PlayerAction::Cancel,
                }),
            },
            Stage::Aiming(PlayerAction::Shoot) => match prey_tile {
                Some(tile) => {
                    out.push(Command::PointAt { tile: Some(tile) });
                    out.push(Command::ConfirmPointer);
                }
                None => out.push(Command::ChooseAction {
                    action: PlayerAction::Cancel,
                }),
            },
            Stage::Aiming(PlayerAction::Cancel)
            | Stage::Waiting
            | Stage::WindUp
            | Stage::Resolving
            | Stage::Recovering => {}
        }
    }
}

fn in_line(from: TileCoord, to: TileCoord) -> bool {
    from != to && (from.x() == to.x() || from.y() == to.y())
}
