//! The mass movement produced by one topple.
//!
//! A [`Redistribution`] is a pure description: which cell gives up how many
//! units, which in-grid cells receive them, and how many fall off the grid.
//! Rules build one; [`Grid::apply`](crate::Grid::apply) validates and
//! writes it.

use sandpile_types::Cell;

use crate::neighborhood::Slot;

/// Units credited to one in-grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    /// The receiving cell.
    pub cell: Cell,
    /// Units received.
    pub units: u64,
}

/// The full effect of one topple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redistribution {
    /// The toppled cell.
    pub origin: Cell,
    /// Units taken from the origin.
    pub removed: u64,
    /// Units credited to in-grid cells, in slot order.
    pub credits: Vec<Credit>,
    /// Units sent to off-grid slots.
    pub dissipated: u64,
}

impl Redistribution {
    /// An empty redistribution: nothing removed, nothing moved.
    pub const fn empty(origin: Cell) -> Self {
        Self {
            origin,
            removed: 0,
            credits: Vec::new(),
            dissipated: 0,
        }
    }

    /// Send `units` from the origin to `slot`.
    ///
    /// Returns `None` on overflow, leaving the redistribution unchanged.
    #[must_use]
    pub fn send(mut self, slot: Slot, units: u64) -> Option<Self> {
        self.removed = self.removed.checked_add(units)?;
        match slot {
            Slot::InGrid(cell) => self.credits.push(Credit { cell, units }),
            Slot::OffGrid => self.dissipated = self.dissipated.checked_add(units)?,
        }
        Some(self)
    }

    /// Total units credited to in-grid cells, or `None` on overflow.
    pub fn delivered(&self) -> Option<u64> {
        self.credits
            .iter()
            .try_fold(0_u64, |acc, credit| acc.checked_add(credit.units))
    }

    /// Whether `removed == delivered + dissipated`.
    pub fn is_balanced(&self) -> bool {
        self.delivered()
            .and_then(|delivered| delivered.checked_add(self.dissipated))
            == Some(self.removed)
    }

    /// Whether the topple moved nothing.
    pub const fn is_empty(&self) -> bool {
        self.removed == 0
    }
}
