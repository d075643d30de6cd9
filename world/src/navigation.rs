//! Bounded-range reachability and occupancy-aware pathfinding over the grid.

use std::collections::{BTreeSet, VecDeque};

use hellguard_core::TileCoord;

use crate::grid::Grid;

/// Cost of stepping onto an occupied tile when occupied tiles are excluded.
const OCCUPIED_STEP_COST: u32 = 10_000;
/// Weight applied to the distance from the origin when ordering the frontier.
const ORIGIN_DISTANCE_WEIGHT: f32 = 1.1;

/// Collects every tile within `range` steps of `origin`, excluding the origin.
///
/// The frontier is processed in insertion order and a tile is re-enqueued
/// whenever a shorter hop count to it is found, so recorded distances only
/// shrink and the search always settles.
pub(crate) fn reachable_tiles(
    grid: &Grid,
    origin: TileCoord,
    range: i32,
    include_occupied: bool,
) -> BTreeSet<TileCoord> {
    let mut reachable = BTreeSet::new();
    let Some(origin_tile) = grid.tile(origin) else {
        return reachable;
    };

    let mut steps: Vec<Option<i32>> = vec![None; grid.tiles().len()];
    let mut frontier = VecDeque::new();
    steps[origin_tile.index()] = Some(0);
    frontier.push_back(origin);

    while let Some(candidate) = frontier.pop_front() {
        let Some(tile) = grid.tile(candidate) else {
            continue;
        };
        let distance = steps[tile.index()].unwrap_or(i32::MAX);
        if distance > range {
            continue;
        }

        for neighbor in tile.neighbors() {
            if !include_occupied && grid.is_occupied(*neighbor) {
                continue;
            }
            if frontier.contains(neighbor) {
                continue;
            }
            let Some(neighbor_tile) = grid.tile(*neighbor) else {
                continue;
            };
            let next = distance + 1;
            let slot = &mut steps[neighbor_tile.index()];
            if slot.map_or(true, |known| next < known) {
                *slot = Some(next);
                frontier.push_back(*neighbor);
            }
        }

        if candidate != origin {
            let _ = reachable.insert(candidate);
        }
    }

    reachable
}

/// Computes a path from `origin` to `target`, excluding the origin itself.
///
/// Every edge costs one step, except that stepping onto an occupied tile costs
/// [`OCCUPIED_STEP_COST`] unless `include_occupied` is set. The frontier is
/// ordered by accumulated cost plus `1.1 * distance(origin)` plus
/// `distance(target)`. Returns an empty path when either endpoint is missing,
/// when they coincide, or when the target cannot be reached.
pub(crate) fn path(
    grid: &Grid,
    origin: TileCoord,
    target: TileCoord,
    include_occupied: bool,
) -> Vec<TileCoord> {
    let (Some(origin_tile), Some(_)) = (grid.tile(origin), grid.tile(target)) else {
        return Vec::new();
    };

    let tile_count = grid.tiles().len();
    let mut costs: Vec<Option<u32>> = vec![None; tile_count];
    let mut ancestors: Vec<Option<TileCoord>> = vec![None; tile_count];
    let mut frontier = vec![origin];
    costs[origin_tile.index()] = Some(0);

    let score = |costs: &[Option<u32>], coord: TileCoord| -> f32 {
        let cost = grid
            .tile(coord)
            .and_then(|tile| costs[tile.index()])
            .unwrap_or(u32::MAX);
        cost as f32
            + coord.manhattan_distance(origin) as f32 * ORIGIN_DISTANCE_WEIGHT
            + coord.manhattan_distance(target) as f32
    };

    while !frontier.is_empty() {
        frontier.sort_by(|a, b| score(&costs, *a).total_cmp(&score(&costs, *b)));
        let candidate = frontier.remove(0);

        if candidate == target {
            return reconstruct(grid, &ancestors, origin, target);
        }

        let Some(tile) = grid.tile(candidate) else {
            continue;
        };
        let base = costs[tile.index()].unwrap_or(u32::MAX);

        for neighbor in tile.neighbors() {
            let Some(neighbor_tile) = grid.tile(*neighbor) else {
                continue;
            };
            let step = if !include_occupied && grid.is_occupied(*neighbor) {
                OCCUPIED_STEP_COST
            } else {
                1
            };
            let cost = base.saturating_add(step);
            let slot = &mut costs[neighbor_tile.index()];
            if slot.map_or(true, |known| cost < known) {
                *slot = Some(cost);
                ancestors[neighbor_tile.index()] = Some(candidate);
                frontier.push(*neighbor);
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    grid: &Grid,
    ancestors: &[Option<TileCoord>],
    origin: TileCoord,
    target: TileCoord,
) -> Vec<TileCoord> {
    let mut steps = Vec::new();
    let mut head = target;
    while head != origin {
        steps.push(head);
        let ancestor = grid
            .tile(head)
            .and_then(|tile| ancestors[tile.index()]);
        match ancestor {
            Some(previous) => head = previous,
            None => return Vec::new(),
        }
    }
    steps.reverse();
    steps
}
