//! The grid: cell values, total mass, elapsed time, and mass history.
//!
//! # Invariants
//!
//! - `total_mass()` always equals the sum of all cells. It is maintained
//!   incrementally with checked arithmetic, never recomputed.
//! - `mass_history().len() == time()`: every time increment appends the
//!   total mass at that moment.
//! - Mutation happens only through [`Grid::drop`] and [`Grid::apply`]. A
//!   failed call leaves every cell, the mass, and the clock untouched.

use rand::Rng;
use tracing::trace;

use sandpile_types::{Cell, Dimensions};

use crate::error::GridError;
use crate::neighborhood::{Neighborhood, Slot};
use crate::redistribution::Redistribution;

/// A `length x width` sandpile grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    dimensions: Dimensions,
    /// Row-major cell values.
    cells: Vec<u64>,
    /// Sum of `cells`.
    mass: u64,
    /// Elapsed time steps.
    time: u64,
    /// Total mass after each time step.
    mass_history: Vec<u64>,
}

impl Grid {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create an all-zero grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if either side is zero or
    /// the cell count overflows.
    pub fn new(length: usize, width: usize) -> Result<Self, GridError> {
        Self::with_offset(length, width, 0)
    }

    /// Create a grid with every cell set to `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] for an empty shape and
    /// [`GridError::MassOverflow`] if the starting mass overflows.
    pub fn with_offset(length: usize, width: usize, offset: u64) -> Result<Self, GridError> {
        let dimensions = Dimensions::new(length, width);
        let count = checked_cell_count(dimensions)?;
        let mass = u64::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(offset))
            .ok_or(GridError::MassOverflow)?;
        Ok(Self {
            dimensions,
            cells: vec![offset; count],
            mass,
            time: 0,
            mass_history: Vec::new(),
        })
    }

    /// Create a grid from explicit rows.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] for empty or ragged input
    /// and [`GridError::MassOverflow`] if the values sum past `u64::MAX`.
    pub fn from_rows(rows: &[Vec<u64>]) -> Result<Self, GridError> {
        let width = rows.first().map_or(0, Vec::len);
        let dimensions = Dimensions::new(rows.len(), width);
        let count = checked_cell_count(dimensions)?;
        if rows.iter().any(|row| row.len() != width) {
            return Err(GridError::InvalidDimensions {
                dimensions,
                reason: "rows have different lengths",
            });
        }

        let mut cells = Vec::with_capacity(count);
        let mut mass: u64 = 0;
        for &value in rows.iter().flatten() {
            mass = mass.checked_add(value).ok_or(GridError::MassOverflow)?;
            cells.push(value);
        }
        Ok(Self {
            dimensions,
            cells,
            mass,
            time: 0,
            mass_history: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add `amount` units to `cell`, or to a uniformly random cell when
    /// `cell` is `None`, then advance time by one step.
    ///
    /// Returns the cell that received the units.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] for an address outside the grid
    /// and [`GridError::MassOverflow`] if the cell or total would overflow.
    pub fn drop(
        &mut self,
        amount: u64,
        cell: Option<Cell>,
        rng: &mut impl Rng,
    ) -> Result<Cell, GridError> {
        let target = match cell {
            Some(cell) => cell,
            None => Cell::new(
                rng.random_range(0..self.dimensions.length),
                rng.random_range(0..self.dimensions.width),
            ),
        };
        let index = self.index(target)?;

        let mass = self.mass.checked_add(amount).ok_or(GridError::MassOverflow)?;
        let slot = self.cells.get_mut(index).ok_or(GridError::OutOfBounds {
            cell: target,
            dimensions: self.dimensions,
        })?;
        *slot = slot.checked_add(amount).ok_or(GridError::MassOverflow)?;
        self.mass = mass;
        self.advance_time();

        trace!(cell = %target, amount, mass = self.mass, "drop");
        Ok(target)
    }

    /// Advance the clock one step and record the current total mass.
    pub fn advance_time(&mut self) {
        self.time = self.time.saturating_add(1);
        self.mass_history.push(self.mass);
    }

    /// Apply one topple.
    ///
    /// Validates that the redistribution balances, that the origin holds at
    /// least `removed` units, and that every credited cell is in bounds.
    /// All checks run before any cell is written.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Unbalanced`], [`GridError::Underflow`],
    /// [`GridError::OutOfBounds`], or [`GridError::MassOverflow`]; the grid
    /// is unchanged in every case.
    pub fn apply(&mut self, redistribution: &Redistribution) -> Result<(), GridError> {
        let origin = redistribution.origin;
        if !redistribution.is_balanced() {
            return Err(GridError::Unbalanced {
                origin,
                removed: redistribution.removed,
                credited: redistribution.delivered().unwrap_or(u64::MAX),
                dissipated: redistribution.dissipated,
            });
        }

        let origin_index = self.index(origin)?;
        let held = self.value_at(origin_index);
        let remaining = held
            .checked_sub(redistribution.removed)
            .ok_or(GridError::Underflow {
                cell: origin,
                held,
                requested: redistribution.removed,
            })?;

        // Stage every write so a late failure leaves the grid untouched.
        let mut staged: Vec<(usize, u64)> = Vec::with_capacity(
            redistribution.credits.len().saturating_add(1),
        );
        staged.push((origin_index, remaining));
        for credit in &redistribution.credits {
            let index = self.index(credit.cell)?;
            let current = staged
                .iter()
                .find(|(i, _)| *i == index)
                .map_or_else(|| self.value_at(index), |&(_, v)| v);
            let updated = current
                .checked_add(credit.units)
                .ok_or(GridError::MassOverflow)?;
            match staged.iter_mut().find(|(i, _)| *i == index) {
                Some(entry) => entry.1 = updated,
                None => staged.push((index, updated)),
            }
        }
        let mass = self
            .mass
            .checked_sub(redistribution.dissipated)
            .ok_or(GridError::MassOverflow)?;

        for (index, value) in staged {
            if let Some(cell) = self.cells.get_mut(index) {
                *cell = value;
            }
        }
        self.mass = mass;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Value of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] for an address outside the grid.
    pub fn get(&self, cell: Cell) -> Result<u64, GridError> {
        let index = self.index(cell)?;
        Ok(self.value_at(index))
    }

    /// Value seen through a neighbor slot. Off-grid slots read as zero.
    pub fn slot_value(&self, slot: Slot) -> u64 {
        slot.cell()
            .and_then(|cell| self.dimensions.index_of(cell))
            .map_or(0, |index| self.value_at(index))
    }

    /// Resolve the neighborhood of `cell` on this grid.
    pub fn neighbors(&self, cell: Cell, neighborhood: Neighborhood) -> Vec<Slot> {
        neighborhood.slots(self.dimensions, cell)
    }

    /// Every cell with its value, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, u64)> + '_ {
        self.cells.iter().enumerate().filter_map(|(index, &value)| {
            self.dimensions.cell_at(index).map(|cell| (cell, value))
        })
    }

    /// A copy of the grid as nested rows.
    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.cells
            .chunks(self.dimensions.width.max(1))
            .map(<[u64]>::to_vec)
            .collect()
    }

    /// Grid dimensions.
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Sum of all cells.
    pub const fn total_mass(&self) -> u64 {
        self.mass
    }

    /// Elapsed time steps.
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// Total mass after each time step; `len() == time()`.
    pub fn mass_history(&self) -> &[u64] {
        &self.mass_history
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn index(&self, cell: Cell) -> Result<usize, GridError> {
        self.dimensions
            .index_of(cell)
            .ok_or(GridError::OutOfBounds {
                cell,
                dimensions: self.dimensions,
            })
    }

    fn value_at(&self, index: usize) -> u64 {
        self.cells.get(index).copied().unwrap_or(0)
    }
}

/// Reject empty shapes and shapes whose cell count overflows.
fn checked_cell_count(dimensions: Dimensions) -> Result<usize, GridError> {
    if dimensions.length == 0 || dimensions.width == 0 {
        return Err(GridError::InvalidDimensions {
            dimensions,
            reason: "length and width must be positive",
        });
    }
    dimensions.cell_count().ok_or(GridError::InvalidDimensions {
        dimensions,
        reason: "cell count overflows",
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::redistribution::Credit;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn new_grid_is_empty() {
        let grid = Grid::new(3, 4).unwrap();
        assert_eq!(grid.dimensions(), Dimensions::new(3, 4));
        assert_eq!(grid.total_mass(), 0);
        assert_eq!(grid.time(), 0);
        assert!(grid.mass_history().is_empty());
        assert_eq!(grid.rows(), vec![vec![0; 4]; 3]);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            Grid::new(0, 4),
            Err(GridError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Grid::new(4, 0),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn offset_sets_starting_mass() {
        let grid = Grid::with_offset(2, 3, 2).unwrap();
        assert_eq!(grid.total_mass(), 12);
        assert_eq!(grid.get(Cell::new(1, 2)).unwrap(), 2);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1, 2], vec![3]];
        assert!(matches!(
            Grid::from_rows(&rows),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn from_rows_sums_mass() {
        let grid = Grid::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(grid.total_mass(), 10);
        assert_eq!(grid.get(Cell::new(1, 0)).unwrap(), 3);
    }

    #[test]
    fn drop_at_cell_advances_time_and_history() {
        let mut grid = Grid::new(3, 3).unwrap();
        let mut rng = rng();
        let hit = grid.drop(2, Some(Cell::new(1, 1)), &mut rng).unwrap();
        assert_eq!(hit, Cell::new(1, 1));
        assert_eq!(grid.get(hit).unwrap(), 2);
        grid.drop(1, Some(Cell::new(0, 0)), &mut rng).unwrap();
        assert_eq!(grid.time(), 2);
        assert_eq!(grid.mass_history(), &[2, 3]);
    }

    #[test]
    fn drop_zero_still_advances_time() {
        let mut grid = Grid::new(2, 2).unwrap();
        grid.drop(0, Some(Cell::new(0, 0)), &mut rng()).unwrap();
        assert_eq!(grid.time(), 1);
        assert_eq!(grid.mass_history(), &[0]);
    }

    #[test]
    fn random_drop_lands_in_bounds() {
        let mut grid = Grid::new(4, 7).unwrap();
        let mut rng = rng();
        for _ in 0..200 {
            let cell = grid.drop(1, None, &mut rng).unwrap();
            assert!(grid.dimensions().contains(cell));
        }
        assert_eq!(grid.total_mass(), 200);
        assert_eq!(grid.iter().map(|(_, v)| v).sum::<u64>(), 200);
    }

    #[test]
    fn out_of_bounds_drop_is_an_error() {
        let mut grid = Grid::new(3, 3).unwrap();
        let result = grid.drop(1, Some(Cell::new(3, 0)), &mut rng());
        assert!(matches!(result, Err(GridError::OutOfBounds { .. })));
        assert_eq!(grid.time(), 0);
        assert_eq!(grid.total_mass(), 0);
    }

    #[test]
    fn apply_moves_mass_and_dissipates() {
        let mut grid = Grid::from_rows(&[vec![4, 0], vec![0, 0]]).unwrap();
        let redistribution = Redistribution {
            origin: Cell::new(0, 0),
            removed: 4,
            credits: vec![
                Credit {
                    cell: Cell::new(1, 0),
                    units: 1,
                },
                Credit {
                    cell: Cell::new(0, 1),
                    units: 1,
                },
            ],
            dissipated: 2,
        };
        grid.apply(&redistribution).unwrap();
        assert_eq!(grid.rows(), vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(grid.total_mass(), 2);
        assert_eq!(grid.time(), 0);
    }

    #[test]
    fn apply_rejects_underflow_without_writing() {
        let mut grid = Grid::from_rows(&[vec![3, 0], vec![0, 0]]).unwrap();
        let before = grid.clone();
        let redistribution = Redistribution {
            origin: Cell::new(0, 0),
            removed: 4,
            credits: Vec::new(),
            dissipated: 4,
        };
        assert!(matches!(
            grid.apply(&redistribution),
            Err(GridError::Underflow { held: 3, .. })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn apply_rejects_out_of_bounds_credit_without_writing() {
        let mut grid = Grid::from_rows(&[vec![4, 0], vec![0, 0]]).unwrap();
        let before = grid.clone();
        let redistribution = Redistribution {
            origin: Cell::new(0, 0),
            removed: 2,
            credits: vec![
                Credit {
                    cell: Cell::new(0, 1),
                    units: 1,
                },
                Credit {
                    cell: Cell::new(5, 5),
                    units: 1,
                },
            ],
            dissipated: 0,
        };
        assert!(matches!(
            grid.apply(&redistribution),
            Err(GridError::OutOfBounds { .. })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn apply_rejects_unbalanced() {
        let mut grid = Grid::from_rows(&[vec![4, 0]]).unwrap();
        let redistribution = Redistribution {
            origin: Cell::new(0, 0),
            removed: 4,
            credits: vec![Credit {
                cell: Cell::new(0, 1),
                units: 1,
            }],
            dissipated: 0,
        };
        assert!(matches!(
            grid.apply(&redistribution),
            Err(GridError::Unbalanced { credited: 1, .. })
        ));
        assert_eq!(grid.total_mass(), 4);
    }

    #[test]
    fn off_grid_slots_read_zero() {
        let grid = Grid::with_offset(2, 2, 5).unwrap();
        assert_eq!(grid.slot_value(Slot::OffGrid), 0);
        assert_eq!(grid.slot_value(Slot::InGrid(Cell::new(1, 1))), 5);
        assert_eq!(
            grid.neighbors(Cell::new(0, 0), Neighborhood::VonNeumann).len(),
            4
        );
    }
}
