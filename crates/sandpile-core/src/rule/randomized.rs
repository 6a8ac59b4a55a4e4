//! Externally driven rule: no cell is ever overloaded on its own. The driver
//! picks a cell at random and topples it; that topple may then start a
//! cascade under no other rule, so every avalanche is exactly one wave.
//!
//! A cell holding fewer units than it has neighbors cannot feed all of
//! them. Which neighbors get a unit is drawn at random per topple, so no
//! direction is favored over a run.

use rand::Rng;
use rand::seq::SliceRandom;
use sandpile_grid::{Grid, Neighborhood, Redistribution};
use sandpile_types::Cell;

use super::RuleError;

pub(super) const fn overloaded(_grid: &Grid, _threshold: u64) -> Vec<Cell> {
    Vec::new()
}

/// Topple with the neighbors in fixed up, down, left, right order.
pub(super) fn topple(grid: &Grid, cell: Cell) -> Result<Redistribution, RuleError> {
    let slots = grid.neighbors(cell, Neighborhood::VonNeumann);
    super::scatter_capped(grid, cell, slots)
}

/// Topple with the neighbors in an order drawn from `rng`.
pub(super) fn topple_shuffled<R: Rng + ?Sized>(
    grid: &Grid,
    cell: Cell,
    rng: &mut R,
) -> Result<Redistribution, RuleError> {
    let mut slots = grid.neighbors(cell, Neighborhood::VonNeumann);
    slots.shuffle(rng);
    super::scatter_capped(grid, cell, slots)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn center_holding(units: u64) -> Grid {
        Grid::from_rows(&[vec![0, 0, 0], vec![0, units, 0], vec![0, 0, 0]]).unwrap()
    }

    #[test]
    fn never_overloaded() {
        let grid = Grid::with_offset(3, 3, 100).unwrap();
        assert!(overloaded(&grid, 1).is_empty());
    }

    #[test]
    fn empty_cell_moves_nothing() {
        let grid = Grid::new(3, 3).unwrap();
        let r = topple(&grid, Cell::new(1, 1)).unwrap();
        assert!(r.is_empty());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(topple_shuffled(&grid, Cell::new(1, 1), &mut rng).unwrap().is_empty());
    }

    #[test]
    fn partial_content_fills_slots_in_order() {
        let grid = center_holding(2);
        let r = topple(&grid, Cell::new(1, 1)).unwrap();
        let cells: Vec<Cell> = r.credits.iter().map(|c| c.cell).collect();
        // Up, then down.
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(2, 1)]);
        assert_eq!(r.removed, 2);
    }

    #[test]
    fn shuffled_topple_removes_what_it_sends() {
        let mut rng = StdRng::seed_from_u64(3);
        for units in 0..=6 {
            let grid = center_holding(units);
            let r = topple_shuffled(&grid, Cell::new(1, 1), &mut rng).unwrap();
            assert_eq!(r.removed, units.min(4));
            assert_eq!(r.credits.len(), usize::try_from(units.min(4)).unwrap());
            assert!(r.credits.iter().all(|c| c.units == 1));
        }
    }

    #[test]
    fn shuffled_topples_favor_no_direction() {
        // Count where single units go over many topples. Each direction
        // should get about a quarter, and the vertical pair should balance
        // the horizontal pair.
        let grid = center_holding(1);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0_u32; 4];
        let draws = 4_000;
        for _ in 0..draws {
            let r = topple_shuffled(&grid, Cell::new(1, 1), &mut rng).unwrap();
            let direction = match r.credits.first().unwrap().cell {
                Cell { row: 0, col: 1 } => 0,
                Cell { row: 2, col: 1 } => 1,
                Cell { row: 1, col: 0 } => 2,
                _ => 3,
            };
            counts[direction] += 1;
        }
        for count in counts {
            assert!((800..1_200).contains(&count), "counts {counts:?}");
        }
        let vertical = counts[0] + counts[1];
        let horizontal = counts[2] + counts[3];
        assert!(vertical.abs_diff(horizontal) < 300, "counts {counts:?}");
    }
}
