//! Square tile grid with orthogonal adjacency and single-occupant tiles.

use glam::Vec3;
use hellguard_core::{EntityId, OccupancyView, TileCoord};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ANCHOR_JITTER_SEED: u64 = 0x6d2b_79f5_3a1c_e407;
const MAX_ANCHOR_JITTER: f32 = 0.04;

/// Neighbor offsets ordered left, up, right, down.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// One grid cell and node in the adjacency graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    coord: TileCoord,
    index: usize,
    anchor: Vec3,
    neighbors: Vec<TileCoord>,
}

impl Tile {
    /// Grid coordinates of the tile.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Flat index of the tile, `x + y * size`.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// World-space position entities stand on.
    #[must_use]
    pub const fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// In-grid orthogonal neighbors ordered left, up, right, down.
    #[must_use]
    pub fn neighbors(&self) -> &[TileCoord] {
        &self.neighbors
    }
}

/// Square grid of tiles together with their occupancy slots.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    size: u32,
    tiles: Vec<Tile>,
    occupants: Vec<Option<EntityId>>,
}

impl Grid {
    /// Builds a `size` by `size` grid with empty tiles.
    #[must_use]
    pub(crate) fn new(size: u32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(ANCHOR_JITTER_SEED);
        let side = size as i32;
        let mut tiles = Vec::with_capacity((size * size) as usize);

        for y in 0..side {
            for x in 0..side {
                let coord = TileCoord::new(x, y);
                let jitter = rng.gen_range(-MAX_ANCHOR_JITTER..=MAX_ANCHOR_JITTER);
                let neighbors = NEIGHBOR_OFFSETS
                    .iter()
                    .map(|(dx, dy)| coord.offset(*dx, *dy))
                    .filter(|neighbor| in_bounds(*neighbor, side))
                    .collect();
                tiles.push(Tile {
                    coord,
                    index: (x + y * side) as usize,
                    anchor: Vec3::new(x as f32, jitter, y as f32),
                    neighbors,
                });
            }
        }

        Self {
            size,
            occupants: vec![None; tiles.len()],
            tiles,
        }
    }

    /// Side length of the grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Every tile in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at the provided column and row, if it exists.
    #[must_use]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<&Tile> {
        self.tile(TileCoord::new(x, y))
    }

    /// Tile at the provided coordinate, if it exists.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).map(|index| &self.tiles[index])
    }

    /// Whether the coordinate names a tile of this grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Center tile of the grid.
    #[must_use]
    pub fn center(&self) -> Option<TileCoord> {
        self.tiles.get(self.tiles.len() / 2).map(Tile::coord)
    }

    /// Entity occupying the coordinate, if any.
    #[must_use]
    pub fn occupant(&self, coord: TileCoord) -> Option<EntityId> {
        self.index(coord).and_then(|index| self.occupants[index])
    }

    /// Whether the coordinate holds an entity.
    #[must_use]
    pub fn is_occupied(&self, coord: TileCoord) -> bool {
        self.occupant(coord).is_some()
    }

    /// Borrowed view over the occupancy slots.
    #[must_use]
    pub fn occupancy_view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.occupants, self.size)
    }

    /// Claims an empty tile for the entity.
    ///
    /// Returns `false` when the tile is missing or already claimed.
    pub(crate) fn occupy(&mut self, coord: TileCoord, entity: EntityId) -> bool {
        let Some(index) = self.index(coord) else {
            return false;
        };
        match self.occupants[index] {
            None => {
                self.occupants[index] = Some(entity);
                true
            }
            Some(current) => {
                log::warn!("{entity:?} cannot occupy {coord:?}, already held by {current:?}");
                false
            }
        }
    }

    /// Releases a tile held by the entity.
    ///
    /// Releasing a tile held by somebody else breaks the tile/entity pairing
    /// maintained by the action chain; the slot is left untouched.
    pub(crate) fn vacate(&mut self, coord: TileCoord, entity: EntityId) -> bool {
        let Some(index) = self.index(coord) else {
            return false;
        };
        let current = self.occupants[index];
        let matches = current == Some(entity);
        debug_assert!(
            matches,
            "{entity:?} attempted to vacate {coord:?} held by {current:?}"
        );
        if !matches {
            log::error!("{entity:?} attempted to vacate {coord:?} held by {current:?}");
            return false;
        }
        self.occupants[index] = None;
        true
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        let side = self.size as i32;
        in_bounds(coord, side).then(|| (coord.x() + coord.y() * side) as usize)
    }
}

fn in_bounds(coord: TileCoord, side: i32) -> bool {
    coord.x() >= 0 && coord.y() >= 0 && coord.x() < side && coord.y() < side
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_are_indexed_row_major() {
        let grid = Grid::new(5);
        assert_eq!(grid.tiles().len(), 25);
        let tile = grid.tile_at(3, 2).expect("tile inside grid");
        assert_eq!(tile.index(), 13);
        assert_eq!(tile.coord(), TileCoord::new(3, 2));
        assert_eq!(grid.center(), Some(TileCoord::new(2, 2)));
    }

    #[test]
    fn out_of_bounds_lookups_are_absent() {
        let grid = Grid::new(3);
        assert!(grid.tile_at(-1, 0).is_none());
        assert!(grid.tile_at(0, 3).is_none());
        assert!(grid.occupant(TileCoord::new(7, 7)).is_none());
        assert!(Grid::default().center().is_none());
    }

    #[test]
    fn neighbor_edges_omit_missing_tiles() {
        let grid = Grid::new(3);
        let corner = grid.tile_at(0, 0).expect("corner");
        assert_eq!(corner.neighbors(), &[TileCoord::new(0, 1), TileCoord::new(1, 0)]);
        let edge = grid.tile_at(1, 0).expect("edge");
        assert_eq!(edge.neighbors().len(), 3);
        let middle = grid.tile_at(1, 1).expect("middle");
        assert_eq!(
            middle.neighbors(),
            &[
                TileCoord::new(0, 1),
                TileCoord::new(1, 2),
                TileCoord::new(2, 1),
                TileCoord::new(1, 0),
            ]
        );
    }

    #[test]
    fn anchors_are_deterministic() {
        let first = Grid::new(7);
        let second = Grid::new(7);
        assert_eq!(first.tiles(), second.tiles());
        for tile in first.tiles() {
            assert!(tile.anchor().y.abs() <= MAX_ANCHOR_JITTER);
        }
    }

    #[test]
    fn occupancy_slots_hold_one_entity() {
        let mut grid = Grid::new(3);
        let coord = TileCoord::new(1, 1);
        assert!(grid.occupy(coord, EntityId::new(1)));
        assert!(!grid.occupy(coord, EntityId::new(2)));
        assert_eq!(grid.occupant(coord), Some(EntityId::new(1)));
        assert!(grid.vacate(coord, EntityId::new(1)));
        assert!(!grid.is_occupied(coord));
    }

    #[test]
    #[should_panic(expected = "attempted to vacate")]
    fn vacating_with_the_wrong_occupant_fails_loudly() {
        let mut grid = Grid::new(3);
        let coord = TileCoord::new(0, 0);
        assert!(grid.occupy(coord, EntityId::new(1)));
        let _ = grid.vacate(coord, EntityId::new(2));
    }
}
