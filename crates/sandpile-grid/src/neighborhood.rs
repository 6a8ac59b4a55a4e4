//! Neighborhoods of a grid cell.
//!
//! A neighborhood is an ordered list of relative offsets. Resolving it
//! against a cell yields one [`Slot`] per offset: either the in-grid cell at
//! that offset, or [`Slot::OffGrid`] when the offset falls past an edge.
//! Units sent to an off-grid slot leave the system.

use sandpile_types::{Cell, Dimensions};

/// Up, down, left, right.
const VON_NEUMANN: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// The eight surrounding cells, row-major.
const MOORE: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The set of relative positions a topple distributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Neighborhood {
    /// The four axis-aligned neighbors.
    VonNeumann,
    /// The eight surrounding neighbors, including diagonals.
    Moore,
}

/// One neighbor position of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A neighbor inside the grid.
    InGrid(Cell),
    /// A neighbor past the edge of the grid.
    OffGrid,
}

impl Slot {
    /// The in-grid cell, if any.
    pub const fn cell(self) -> Option<Cell> {
        match self {
            Self::InGrid(cell) => Some(cell),
            Self::OffGrid => None,
        }
    }
}

impl Neighborhood {
    /// Number of slots in this neighborhood.
    pub const fn size(self) -> usize {
        self.offsets().len()
    }

    /// Relative `(row, col)` offsets, in slot order.
    pub const fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Self::VonNeumann => &VON_NEUMANN,
            Self::Moore => &MOORE,
        }
    }

    /// Resolve every slot of `cell` against a grid of `dimensions`.
    pub fn slots(self, dimensions: Dimensions, cell: Cell) -> Vec<Slot> {
        self.offsets()
            .iter()
            .map(|&(dr, dc)| resolve(dimensions, cell, dr, dc))
            .collect()
    }
}

/// Resolve a single offset. Negative coordinates and coordinates at or past
/// the far edge are off-grid.
fn resolve(dimensions: Dimensions, cell: Cell, dr: isize, dc: isize) -> Slot {
    let row = cell.row.checked_add_signed(dr);
    let col = cell.col.checked_add_signed(dc);
    match (row, col) {
        (Some(row), Some(col)) if dimensions.contains(Cell::new(row, col)) => {
            Slot::InGrid(Cell::new(row, col))
        }
        _ => Slot::OffGrid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_grid(slots: &[Slot]) -> usize {
        slots.iter().filter(|s| s.cell().is_some()).count()
    }

    #[test]
    fn interior_cell_has_all_slots_in_grid() {
        let dims = Dimensions::new(5, 5);
        let centre = Cell::new(2, 2);
        assert_eq!(in_grid(&Neighborhood::VonNeumann.slots(dims, centre)), 4);
        assert_eq!(in_grid(&Neighborhood::Moore.slots(dims, centre)), 8);
    }

    #[test]
    fn corner_loses_slots() {
        let dims = Dimensions::new(5, 5);
        let corner = Cell::new(0, 0);
        assert_eq!(in_grid(&Neighborhood::VonNeumann.slots(dims, corner)), 2);
        assert_eq!(in_grid(&Neighborhood::Moore.slots(dims, corner)), 3);

        let far = Cell::new(4, 4);
        assert_eq!(in_grid(&Neighborhood::VonNeumann.slots(dims, far)), 2);
        assert_eq!(in_grid(&Neighborhood::Moore.slots(dims, far)), 3);
    }

    #[test]
    fn edge_cell_loses_one_orthogonal_slot() {
        let dims = Dimensions::new(5, 5);
        let slots = Neighborhood::VonNeumann.slots(dims, Cell::new(0, 2));
        assert_eq!(
            slots,
            vec![
                Slot::OffGrid,
                Slot::InGrid(Cell::new(1, 2)),
                Slot::InGrid(Cell::new(0, 1)),
                Slot::InGrid(Cell::new(0, 3)),
            ]
        );
    }

    #[test]
    fn moore_slots_are_row_major() {
        let dims = Dimensions::new(3, 3);
        let cells: Vec<Cell> = Neighborhood::Moore
            .slots(dims, Cell::new(1, 1))
            .into_iter()
            .filter_map(Slot::cell)
            .collect();
        let mut sorted = cells.clone();
        sorted.sort();
        assert_eq!(cells, sorted);
        assert_eq!(Neighborhood::Moore.size(), 8);
        assert_eq!(Neighborhood::VonNeumann.size(), 4);
    }

    #[test]
    fn single_row_grid_has_no_vertical_neighbors() {
        let dims = Dimensions::new(1, 3);
        let slots = Neighborhood::VonNeumann.slots(dims, Cell::new(0, 1));
        assert_eq!(in_grid(&slots), 2);
    }
}
