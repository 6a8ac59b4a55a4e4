//! Core value types: grid coordinates, dimensions, and avalanche records.

use serde::{Deserialize, Serialize};

use crate::enums::{DistanceMetric, Observable};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Address of a grid cell, zero-based `(row, col)`.
///
/// Ordering is row-major, which is the order in which overloaded cells are
/// reported and toppled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row index, `0..length`.
    pub row: usize,
    /// Column index, `0..width`.
    pub col: usize,
}

impl Cell {
    /// Create a cell address.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance `|dr| + |dc|` to another cell.
    pub const fn manhattan(self, other: Self) -> usize {
        self.row.abs_diff(other.row).saturating_add(self.col.abs_diff(other.col))
    }

    /// Euclidean distance to another cell.
    pub fn euclidean(self, other: Self) -> f64 {
        // Grid coordinates are far below 2^52.
        #[allow(clippy::cast_precision_loss)]
        let (dr, dc) = (
            self.row.abs_diff(other.row) as f64,
            self.col.abs_diff(other.col) as f64,
        );
        dr.hypot(dc)
    }

    /// Distance to another cell under the given metric.
    pub fn distance(self, other: Self, metric: DistanceMetric) -> f64 {
        match metric {
            DistanceMetric::Euclidean => self.euclidean(other),
            // Grid coordinates are far below 2^52.
            #[allow(clippy::cast_precision_loss)]
            DistanceMetric::Manhattan => self.manhattan(other) as f64,
        }
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Size of a grid: `length` rows by `width` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of rows.
    pub length: usize,
    /// Number of columns.
    pub width: usize,
}

impl Dimensions {
    /// Create a dimensions value. Validation happens where a grid is built.
    pub const fn new(length: usize, width: usize) -> Self {
        Self { length, width }
    }

    /// Number of cells, or `None` on overflow.
    pub const fn cell_count(self) -> Option<usize> {
        self.length.checked_mul(self.width)
    }

    /// Whether the cell lies inside the grid.
    pub const fn contains(self, cell: Cell) -> bool {
        cell.row < self.length && cell.col < self.width
    }

    /// Row-major index of an in-bounds cell.
    pub const fn index_of(self, cell: Cell) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        match cell.row.checked_mul(self.width) {
            Some(base) => base.checked_add(cell.col),
            None => None,
        }
    }

    /// Cell at a row-major index.
    pub const fn cell_at(self, index: usize) -> Option<Cell> {
        if self.width == 0 {
            return None;
        }
        let cell = Cell::new(index / self.width, index % self.width);
        if self.contains(cell) { Some(cell) } else { None }
    }

    /// The centre cell, rounding towards the origin on even sides.
    pub const fn centre(self) -> Cell {
        Cell::new(
            self.length.saturating_sub(1) / 2,
            self.width.saturating_sub(1) / 2,
        )
    }
}

impl core::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.length, self.width)
    }
}

// ---------------------------------------------------------------------------
// Avalanche record
// ---------------------------------------------------------------------------

/// Statistics of one completed avalanche.
///
/// Created once when the grid returns to a stable configuration and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvalancheRecord {
    /// Time steps elapsed between avalanche start and stability.
    pub duration: u64,
    /// Total number of individual topple applications.
    pub topples: u64,
    /// Number of distinct cells that toppled at least once.
    pub area: u64,
    /// Mass before the avalanche minus mass after it.
    pub lost_mass: u64,
    /// Maximum distance from the origin to any toppled cell.
    pub extent: f64,
    /// First toppled cell.
    pub origin: Cell,
    /// Number of waves the relaxation took.
    pub waves: u64,
}

impl AvalancheRecord {
    /// Value of one observable as a float, for series export.
    // Counts stay far below 2^52 in any realistic run.
    #[allow(clippy::cast_precision_loss)]
    pub fn observable(&self, observable: Observable) -> f64 {
        match observable {
            Observable::Duration => self.duration as f64,
            Observable::Topples => self.topples as f64,
            Observable::Area => self.area as f64,
            Observable::LostMass => self.lost_mass as f64,
            Observable::Extent => self.extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_and_euclidean_distances() {
        let a = Cell::new(1, 1);
        let b = Cell::new(4, 5);
        assert_eq!(a.manhattan(b), 7);
        assert!((a.euclidean(b) - 5.0).abs() < 1e-12);
        assert!((a.distance(b, DistanceMetric::Manhattan) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn index_roundtrip_is_row_major() {
        let dims = Dimensions::new(3, 4);
        assert_eq!(dims.index_of(Cell::new(1, 2)), Some(6));
        assert_eq!(dims.cell_at(6), Some(Cell::new(1, 2)));
        assert_eq!(dims.index_of(Cell::new(3, 0)), None);
        assert_eq!(dims.cell_at(12), None);
    }

    #[test]
    fn centre_of_odd_and_even_grids() {
        assert_eq!(Dimensions::new(5, 5).centre(), Cell::new(2, 2));
        assert_eq!(Dimensions::new(10, 4).centre(), Cell::new(4, 1));
    }

    #[test]
    fn cells_order_row_major() {
        let mut cells = vec![Cell::new(1, 0), Cell::new(0, 3), Cell::new(0, 1)];
        cells.sort();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(0, 3), Cell::new(1, 0)]);
    }
}
