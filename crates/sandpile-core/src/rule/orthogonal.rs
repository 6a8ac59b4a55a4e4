//! The classic four-neighbor rule.

use sandpile_grid::{Grid, Neighborhood, Redistribution};
use sandpile_types::Cell;

use super::RuleError;

pub(super) fn overloaded(grid: &Grid, threshold: u64) -> Vec<Cell> {
    super::at_or_above(grid, threshold)
}

pub(super) fn topple(grid: &Grid, cell: Cell) -> Result<Redistribution, RuleError> {
    super::scatter(grid, cell, Neighborhood::VonNeumann)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn interior_topple_keeps_everything() {
        let grid = Grid::from_rows(&[vec![0, 0, 0], vec![0, 4, 0], vec![0, 0, 0]]).unwrap();
        let r = topple(&grid, Cell::new(1, 1)).unwrap();
        assert_eq!(r.removed, 4);
        assert_eq!(r.dissipated, 0);
        assert_eq!(r.credits.len(), 4);
    }

    #[test]
    fn corner_topple_loses_two() {
        let grid = Grid::from_rows(&[vec![4, 0], vec![0, 0]]).unwrap();
        let r = topple(&grid, Cell::new(0, 0)).unwrap();
        assert_eq!(r.removed, 4);
        assert_eq!(r.dissipated, 2);
        assert!(r.is_balanced());
    }

    #[test]
    fn overloaded_is_row_major() {
        let grid = Grid::from_rows(&[vec![0, 5], vec![4, 3]]).unwrap();
        assert_eq!(
            overloaded(&grid, 4),
            vec![Cell::new(0, 1), Cell::new(1, 0)]
        );
    }
}
