//! Error types for the `sandpile-grid` crate.
//!
//! Every fallible grid operation returns [`GridError`]. A failed operation
//! leaves the grid exactly as it was.

use sandpile_types::{Cell, Dimensions};

/// Errors that can occur during grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A cell address lies outside the grid.
    #[error("cell {cell} is outside the {dimensions} grid")]
    OutOfBounds {
        /// The offending address.
        cell: Cell,
        /// The grid's dimensions.
        dimensions: Dimensions,
    },

    /// The requested grid shape cannot be built.
    #[error("invalid grid dimensions {dimensions}: {reason}")]
    InvalidDimensions {
        /// The requested dimensions.
        dimensions: Dimensions,
        /// Why the shape was rejected.
        reason: &'static str,
    },

    /// A topple asked to remove more units than the cell holds.
    #[error("cell {cell} holds {held} but {requested} were removed")]
    Underflow {
        /// The toppled cell.
        cell: Cell,
        /// Units the cell holds.
        held: u64,
        /// Units the topple tried to remove.
        requested: u64,
    },

    /// A cell value or the total mass would exceed `u64::MAX`.
    #[error("mass overflow")]
    MassOverflow,

    /// A redistribution does not balance.
    #[error(
        "unbalanced redistribution at {origin}: removed {removed}, credited {credited}, dissipated {dissipated}"
    )]
    Unbalanced {
        /// The toppled cell.
        origin: Cell,
        /// Units taken from the origin.
        removed: u64,
        /// Units credited to in-grid cells.
        credited: u64,
        /// Units lost off the grid.
        dissipated: u64,
    },
}

