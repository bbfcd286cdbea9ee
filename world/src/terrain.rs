//! Terrain face visibility derived from neighbouring cell heights.

use ridge_defence_core::{CellCoord, Direction};

use crate::GridMap;

/// Faces of a terrain cell that the presentation layer should emit.
///
/// Top and bottom faces are always emitted. A side face is emitted only when
/// the cell is strictly taller than its neighbour in that direction, so no
/// wall is ever built between cells of equal height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleFaces {
    north: bool,
    east: bool,
    south: bool,
    west: bool,
}

impl VisibleFaces {
    /// Top faces are always visible.
    #[must_use]
    pub const fn top(&self) -> bool {
        true
    }

    /// Bottom faces are always visible.
    #[must_use]
    pub const fn bottom(&self) -> bool {
        true
    }

    /// Reports whether the side face toward `direction` is visible.
    #[must_use]
    pub const fn side(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::East => self.east,
            Direction::South => self.south,
            Direction::West => self.west,
        }
    }

    /// Directions whose side faces are visible.
    pub fn sides(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.side(*direction))
    }
}

/// Side-face rule shared by every cell: emit only toward strictly shorter
/// neighbours.
#[must_use]
pub fn side_face_visible(height: f32, neighbor_height: f32) -> bool {
    height - neighbor_height > 0.0
}

impl GridMap {
    /// Height multiplier of the neighbour in `direction`; missing neighbours
    /// count as zero.
    #[must_use]
    pub fn neighbor_height(&self, coord: CellCoord, direction: Direction) -> f32 {
        coord
            .neighbor(direction)
            .and_then(|neighbor| self.cell(neighbor))
            .map_or(0.0, |cell| cell.height_alpha())
    }

    /// Faces to emit for the cell, or `None` when it has no terrain.
    #[must_use]
    pub fn visible_faces(&self, coord: CellCoord) -> Option<VisibleFaces> {
        let height = self.cell(coord)?.height_alpha();
        let visible = |direction| side_face_visible(height, self.neighbor_height(coord, direction));
        Some(VisibleFaces {
            north: visible(Direction::North),
            east: visible(Direction::East),
            south: visible(Direction::South),
            west: visible(Direction::West),
        })
    }
}
