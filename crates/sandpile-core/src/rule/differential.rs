//! Slope rule: a cell topples when it stands at least `threshold` above any
//! of its eight neighbors, and then slides one unit down every slope that
//! steep.
//!
//! Off-grid neighbors read as zero, so a boundary cell holding `threshold`
//! or more is always overloaded.

use sandpile_grid::{Grid, Neighborhood, Redistribution, Slot};
use sandpile_types::Cell;

use super::RuleError;

/// Whether `value` stands at least `threshold` above the neighbor.
fn steep(value: u64, neighbor: u64, threshold: u64) -> bool {
    value.checked_sub(neighbor).is_some_and(|drop| drop >= threshold)
}

fn steep_slots(grid: &Grid, cell: Cell, value: u64, threshold: u64) -> Vec<Slot> {
    grid.neighbors(cell, Neighborhood::Moore)
        .into_iter()
        .filter(|&slot| steep(value, grid.slot_value(slot), threshold))
        .collect()
}

pub(super) fn overloaded(grid: &Grid, threshold: u64) -> Vec<Cell> {
    grid.iter()
        .filter(|&(cell, value)| {
            grid.neighbors(cell, Neighborhood::Moore)
                .into_iter()
                .any(|slot| steep(value, grid.slot_value(slot), threshold))
        })
        .map(|(cell, _)| cell)
        .collect()
}

pub(super) fn topple(
    grid: &Grid,
    cell: Cell,
    threshold: u64,
) -> Result<Redistribution, RuleError> {
    let value = grid.get(cell)?;
    let slots = steep_slots(grid, cell, value, threshold);
    super::scatter_capped(grid, cell, slots)
}
