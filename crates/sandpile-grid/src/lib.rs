//! The sandpile grid: cells, mass, elapsed time, and the single writer.
//!
//! The grid is a `length x width` row-major array of non-negative integer
//! cell values. It owns the elapsed time counter and the per-step mass
//! history, and it is mutated through exactly two doors: [`Grid::drop`]
//! (the only mass source) and [`Grid::apply`] (the only topple writer).
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid operations.
//! - [`grid`] -- The [`Grid`] itself: construction, drops, time, reads.
//! - [`neighborhood`] -- Von Neumann and Moore neighborhoods, resolved to
//!   in-grid cells or off-grid slots.
//! - [`redistribution`] -- The [`Redistribution`] a topple produces and the
//!   grid applies.

pub mod error;
pub mod grid;
pub mod neighborhood;
pub mod redistribution;

// Re-export primary types at crate root.
pub use error::GridError;
pub use grid::Grid;
pub use neighborhood::{Neighborhood, Slot};
pub use redistribution::{Credit, Redistribution};
