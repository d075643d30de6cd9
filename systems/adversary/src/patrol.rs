//! Patrol route bookkeeping and the pure stepping planner.

use hellguard_core::{EntityId, OccupancyView, TileCoord};

/// Cyclic patrol loop walked by the adversary, with its position and heading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatrolState {
    route: Vec<TileCoord>,
    current: usize,
    forward: bool,
}

impl PatrolState {
    /// Builds the square ring of the given radius around `center`.
    ///
    /// The ring starts at `center + (radius, radius)` and walks `2 * radius`
    /// tiles each toward -x, -y, +x and +y, so its first tile is the one
    /// reached after the first step and its last tile is the starting corner.
    #[must_use]
    pub fn ring(center: TileCoord, radius: u32) -> Self {
        let radius = i32::try_from(radius).unwrap_or(0);
        let mut cursor = center.offset(radius, radius);
        let mut route = Vec::with_capacity((radius.max(0) * 8) as usize);
        for (dx, dy) in [(-1, 0), (0, -1), (1, 0), (0, 1)] {
            for _ in 0..radius * 2 {
                cursor = cursor.offset(dx, dy);
                route.push(cursor);
            }
        }
        Self {
            route,
            current: 0,
            forward: true,
        }
    }

    /// Returns the patrol placed on `current` heading forward or backward.
    #[must_use]
    pub fn positioned(mut self, current: usize, forward: bool) -> Self {
        self.current = if self.route.is_empty() {
            0
        } else {
            current % self.route.len()
        };
        self.forward = forward;
        self
    }

    /// Tiles of the loop in walking order.
    #[must_use]
    pub fn route(&self) -> &[TileCoord] {
        &self.route
    }

    /// Route index the adversary considers itself on.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// Whether the adversary walks toward increasing route indices.
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    /// Route tile the adversary considers itself on.
    #[must_use]
    pub fn current_tile(&self) -> Option<TileCoord> {
        self.route.get(self.current).copied()
    }

    /// Index reached after `steps` moves from `from` in the current heading.
    #[must_use]
    pub fn index_after(&self, from: usize, steps: i64) -> usize {
        if self.route.is_empty() {
            return 0;
        }
        let heading = if self.forward { 1 } else { -1 };
        let len = self.route.len() as i64;
        (from as i64 + heading * steps).rem_euclid(len) as usize
    }

    /// Route tile `steps` moves ahead of the current position.
    #[must_use]
    pub fn next_tile(&self, steps: u32) -> Option<TileCoord> {
        self.route
            .get(self.index_after(self.current, i64::from(steps)))
            .copied()
    }

    /// Position of a tile on the route, if it lies on it.
    #[must_use]
    pub fn position_of(&self, tile: TileCoord) -> Option<usize> {
        self.route.iter().position(|candidate| *candidate == tile)
    }

    /// Re-anchors the patrol on a route tile the adversary was moved onto.
    pub fn resync(&mut self, index: usize) {
        if index < self.route.len() {
            self.current = index;
        }
    }

    /// Steps the bookkeeping back one tile so the next step returns to the
    /// route tile the adversary was knocked off.
    pub fn rewind(&mut self) {
        self.current = self.index_after(self.current, -1);
    }

    /// Reverses the walking direction.
    pub fn turn_around(&mut self) {
        self.forward = !self.forward;
    }

    /// Plans the walk for moves `first_move..movement` of a patrol turn.
    ///
    /// Each step first runs the safety lookahead; an unsafe step reverses the
    /// heading before moving. A step onto a tile held by another entity ends
    /// the plan with a strike on that tile. The patrol position is advanced as
    /// the steps are planned.
    pub fn plan(
        &mut self,
        occupancy: &OccupancyView<'_>,
        actors: Actors,
        first_move: u32,
        movement: u32,
    ) -> PatrolPlan {
        let mut plan = PatrolPlan::default();
        if self.route.is_empty() {
            return plan;
        }

        for step in first_move..movement {
            let next = self.index_after(self.current, 1);
            let blocker = occupancy
                .occupant(self.route[next])
                .filter(|occupant| *occupant != actors.adversary);

            let safe = match blocker {
                Some(occupant) if Some(occupant) == actors.player => true,
                Some(_) => looks_safe_to_move(occupancy, actors.player, self, self.current, next, 0),
                None => {
                    let extra = movement - step - 1;
                    looks_safe_to_move(occupancy, actors.player, self, self.current, next, extra)
                }
            };
            if !safe {
                log::debug!("patrol turns around before {:?}", self.route[next]);
                self.turn_around();
            }

            let target_index = self.index_after(self.current, 1);
            let target = self.route[target_index];
            self.current = target_index;

            let struck = occupancy
                .occupant(target)
                .filter(|occupant| *occupant != actors.adversary);
            if struck.is_some() {
                plan.strike = Some(target);
                break;
            }
            plan.path.push(target);
        }

        plan
    }
}

/// Entities the planner needs to tell apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actors {
    /// The patrolling adversary.
    pub adversary: EntityId,
    /// The player, while it stands on the board.
    pub player: Option<EntityId>,
}

/// Outcome of planning a patrol turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatrolPlan {
    /// Free tiles walked in order.
    pub path: Vec<TileCoord>,
    /// Occupied tile struck once the walk ends.
    pub strike: Option<TileCoord>,
}

/// Decides whether stepping from route index `start` onto `next` looks safe.
///
/// A step is safe when the player is not adjacent to the stop tile. When the
/// stop tile is free, remaining moves decide: none left means the adversary
/// would stop next to the player; one or more than two left means it walks
/// on; exactly two left is safe when the player stands on the route, and is
/// otherwise decided by looking one more tile ahead with no moves left. When
/// the stop tile is occupied, the player is only considered hidden while it
/// stands directly behind the struck tile.
#[must_use]
pub fn looks_safe_to_move(
    occupancy: &OccupancyView<'_>,
    player: Option<EntityId>,
    patrol: &PatrolState,
    start: usize,
    next: usize,
    extra_moves: u32,
) -> bool {
    let (Some(start_tile), Some(stop_tile)) = (patrol.route.get(start), patrol.route.get(next))
    else {
        return true;
    };
    let Some(player) = player else {
        return true;
    };
    let Some(player_tile) = occupancy
        .neighbors(*stop_tile)
        .find(|neighbor| occupancy.occupant(*neighbor) == Some(player))
    else {
        return true;
    };

    if occupancy.occupant(*stop_tile).is_none() {
        return match extra_moves {
            0 => false,
            2 if patrol.position_of(player_tile).is_some() => true,
            2 => looks_safe_to_move(
                occupancy,
                Some(player),
                patrol,
                patrol.index_after(next, 1),
                patrol.index_after(next, 2),
                0,
            ),
            _ => true,
        };
    }

    let approach = (stop_tile.x() - start_tile.x(), stop_tile.y() - start_tile.y());
    let beyond = (player_tile.x() - stop_tile.x(), player_tile.y() - stop_tile.y());
    approach == beyond
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 7;
    const ADVERSARY: EntityId = EntityId::new(1);
    const PLAYER: EntityId = EntityId::new(2);
    const BOULDER: EntityId = EntityId::new(3);

    fn center() -> TileCoord {
        TileCoord::new(3, 3)
    }

    fn cells(placements: &[(TileCoord, EntityId)]) -> Vec<Option<EntityId>> {
        let mut cells = vec![None; (SIZE * SIZE) as usize];
        for (tile, entity) in placements {
            cells[(tile.x() + tile.y() * SIZE as i32) as usize] = Some(*entity);
        }
        cells
    }

    #[test]
    fn ring_walks_the_square_around_the_center() {
        let patrol = PatrolState::ring(center(), 1);
        let expected: Vec<TileCoord> = [(3, 4), (2, 4), (2, 3), (2, 2), (3, 2), (4, 2), (4, 3), (4, 4)]
            .into_iter()
            .map(|(x, y)| TileCoord::new(x, y))
            .collect();
        assert_eq!(patrol.route(), expected.as_slice());

        let wide = PatrolState::ring(center(), 2);
        assert_eq!(wide.route().len(), 16);
        assert!(wide
            .route()
            .iter()
            .all(|tile| (tile.x() - 3).abs() == 2 || (tile.y() - 3).abs() == 2));
        assert!(PatrolState::ring(center(), 0).route().is_empty());
    }

    #[test]
    fn indices_wrap_in_both_directions() {
        let patrol = PatrolState::ring(center(), 1).positioned(7, true);
        assert_eq!(patrol.index_after(7, 1), 0);
        let backward = patrol.clone().positioned(0, false);
        assert_eq!(backward.index_after(0, 1), 7);
        assert_eq!(backward.next_tile(2), Some(TileCoord::new(4, 3)));
        assert_eq!(patrol.position_of(TileCoord::new(2, 2)), Some(3));
        assert_eq!(patrol.position_of(center()), None);
    }

    #[test]
    fn player_further_along_the_loop_with_two_moves_left_is_safe() {
        let patrol = PatrolState::ring(center(), 1).positioned(3, true);
        let player_tile = patrol.route()[5];
        let cells = cells(&[(patrol.route()[3], ADVERSARY), (player_tile, PLAYER)]);
        let occupancy = OccupancyView::new(&cells, SIZE);

        assert!(looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 2));
        assert!(looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 1));
        assert!(looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 3));
        assert!(!looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 0));
    }

    #[test]
    fn player_inside_the_ring_is_checked_one_tile_further() {
        let patrol = PatrolState::ring(center(), 1).positioned(3, true);
        let cells = cells(&[(patrol.route()[3], ADVERSARY), (center(), PLAYER)]);
        let occupancy = OccupancyView::new(&cells, SIZE);
        // Two tiles past the stop the route borders the center again.
        assert!(!looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 2));

        let outside = cells_with_player(TileCoord::new(3, 1), &patrol);
        let occupancy = OccupancyView::new(&outside, SIZE);
        assert!(looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 2));
    }

    fn cells_with_player(tile: TileCoord, patrol: &PatrolState) -> Vec<Option<EntityId>> {
        cells(&[(patrol.route()[3], ADVERSARY), (tile, PLAYER)])
    }

    #[test]
    fn player_behind_a_struck_tile_is_hidden() {
        let patrol = PatrolState::ring(center(), 1).positioned(3, true);
        let stop = patrol.route()[4];
        let behind = cells(&[(stop, BOULDER), (TileCoord::new(4, 2), PLAYER)]);
        let occupancy = OccupancyView::new(&behind, SIZE);
        assert!(looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 0));

        let beside = cells(&[(stop, BOULDER), (TileCoord::new(3, 1), PLAYER)]);
        let occupancy = OccupancyView::new(&beside, SIZE);
        assert!(!looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, 3, 4, 0));
    }

    #[test]
    fn absent_player_never_makes_a_step_unsafe() {
        let patrol = PatrolState::ring(center(), 1);
        let cells = cells(&[]);
        let occupancy = OccupancyView::new(&cells, SIZE);
        for start in 0..8 {
            let next = patrol.index_after(start, 1);
            assert!(looks_safe_to_move(&occupancy, None, &patrol, start, next, 0));
        }
    }

    #[test]
    fn lookahead_terminates_for_every_budget_and_position() {
        let patrol = PatrolState::ring(center(), 2);
        for player_x in 0..SIZE as i32 {
            for player_y in 0..SIZE as i32 {
                let cells = cells(&[(TileCoord::new(player_x, player_y), PLAYER)]);
                let occupancy = OccupancyView::new(&cells, SIZE);
                for start in 0..patrol.route().len() {
                    for extra in 0..=patrol.route().len() as u32 {
                        let next = patrol.index_after(start, 1);
                        let _ = looks_safe_to_move(&occupancy, Some(PLAYER), &patrol, start, next, extra);
                    }
                }
            }
        }
    }

    #[test]
    fn plan_walks_the_full_budget_on_an_empty_board() {
        let mut patrol = PatrolState::ring(center(), 1).positioned(0, true);
        let cells = cells(&[(patrol.route()[0], ADVERSARY)]);
        let occupancy = OccupancyView::new(&cells, SIZE);
        let plan = patrol.plan(
            &occupancy,
            Actors {
                adversary: ADVERSARY,
                player: Some(PLAYER),
            },
            0,
            3,
        );
        assert_eq!(plan.path, patrol.route()[1..=3].to_vec());
        assert_eq!(plan.strike, None);
        assert_eq!(patrol.current_index(), 3);
    }

    #[test]
    fn plan_strikes_the_player_on_the_route() {
        let mut patrol = PatrolState::ring(center(), 1).positioned(0, true);
        let player_tile = patrol.route()[2];
        let cells = cells(&[(patrol.route()[0], ADVERSARY), (player_tile, PLAYER)]);
        let occupancy = OccupancyView::new(&cells, SIZE);
        let plan = patrol.plan(
            &occupancy,
            Actors {
                adversary: ADVERSARY,
                player: Some(PLAYER),
            },
            0,
            3,
        );
        assert_eq!(plan.path, vec![patrol.route()[1]]);
        assert_eq!(plan.strike, Some(player_tile));
        assert_eq!(patrol.current_index(), 2);
    }

    #[test]
    fn plan_turns_around_instead_of_stopping_next_to_the_player() {
        let mut patrol = PatrolState::ring(center(), 1).positioned(3, true);
        // Stopping on index 4 with no moves left would end beside the player.
        let cells = cells(&[(patrol.route()[3], ADVERSARY), (TileCoord::new(3, 1), PLAYER)]);
        let occupancy = OccupancyView::new(&cells, SIZE);
        let plan = patrol.plan(
            &occupancy,
            Actors {
                adversary: ADVERSARY,
                player: Some(PLAYER),
            },
            2,
            3,
        );
        assert!(!patrol.is_forward());
        assert_eq!(plan.path, vec![patrol.route()[2]]);
    }
}
