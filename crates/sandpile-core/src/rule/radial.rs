//! Eight-neighbor rule: a toppling cell feeds its whole Moore neighborhood.

use sandpile_grid::{Grid, Neighborhood, Redistribution};
use sandpile_types::Cell;

use super::RuleError;

pub(super) fn overloaded(grid: &Grid, threshold: u64) -> Vec<Cell> {
    super::at_or_above(grid, threshold)
}

pub(super) fn topple(grid: &Grid, cell: Cell) -> Result<Redistribution, RuleError> {
    super::scatter(grid, cell, Neighborhood::Moore)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn interior_topple_removes_eight() {
        let grid = Grid::from_rows(&[vec![0, 0, 0], vec![0, 8, 0], vec![0, 0, 0]]).unwrap();
        let r = topple(&grid, Cell::new(1, 1)).unwrap();
        assert_eq!(r.removed, 8);
        assert_eq!(r.dissipated, 0);
        assert_eq!(r.credits.len(), 8);
    }

    #[test]
    fn corner_topple_keeps_three() {
        let grid = Grid::from_rows(&[vec![8, 0], vec![0, 0]]).unwrap();
        let r = topple(&grid, Cell::new(0, 0)).unwrap();
        assert_eq!(r.delivered(), Some(3));
        assert_eq!(r.dissipated, 5);
    }

    #[test]
    fn seven_is_stable_at_eight() {
        let grid = Grid::from_rows(&[vec![7, 7], vec![7, 7]]).unwrap();
        assert!(overloaded(&grid, 8).is_empty());
    }
}
