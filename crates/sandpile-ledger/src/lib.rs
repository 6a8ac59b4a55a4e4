//! Mass bookkeeping for the sandpile simulation.
//!
//! Every unit of mass on the grid is tracked through this ledger. Mass enters
//! only through drops and leaves only through dissipation off the grid edge.
//! Topples move mass between cells and must balance exactly: what the origin
//! loses is what its neighbors gain plus what falls off the grid.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`MassLedger`]: running totals plus an append-only
//!   log of per-avalanche flow summaries.
//! - [`conservation`] -- Conservation checks for one avalanche and for the
//!   whole session.
//!
//! # Conservation Law
//!
//! For every avalanche:
//!
//! ```text
//! removed == delivered + dissipated
//! mass_before - mass_after == dissipated
//! ```
//!
//! And for the session as a whole:
//!
//! ```text
//! initial_mass + dropped - dissipated == current_mass
//! ```
//!
//! A violation produces a [`MassAnomaly`]. The ledger never panics; it
//! returns errors.
//!
//! # Usage
//!
//! ```
//! use sandpile_ledger::{MassLedger, ToppleFlow};
//! use sandpile_ledger::conservation::ConservationResult;
//! use sandpile_types::Cell;
//!
//! let mut ledger = MassLedger::new(0);
//! ledger.record_drop(4).ok();
//!
//! // A corner topple: 4 removed, 2 delivered, 2 dissipated.
//! ledger.begin_avalanche(4).ok();
//! ledger
//!     .record_topple(&ToppleFlow::new(Cell::new(0, 0), 4, 2, 2))
//!     .ok();
//! let flows = ledger.close_avalanche(2).ok();
//!
//! assert_eq!(flows.map(|f| f.dissipated), Some(2));
//! assert_eq!(ledger.verify_session(2), ConservationResult::Balanced);
//! ```

pub mod conservation;
pub mod ledger;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::{AvalancheFlows, MassLedger, ToppleFlow};

use sandpile_types::Cell;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording mass flows.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A single topple did not balance.
    #[error(
        "unbalanced topple at {origin}: removed {removed}, delivered {delivered}, dissipated {dissipated}"
    )]
    UnbalancedTopple {
        /// The toppled cell.
        origin: Cell,
        /// Units taken from the origin.
        removed: u64,
        /// Units credited to in-grid neighbors.
        delivered: u64,
        /// Units lost off the grid.
        dissipated: u64,
    },

    /// A topple was recorded with no avalanche open.
    #[error("no avalanche is open")]
    NoOpenAvalanche,

    /// An avalanche was opened while another one was still open.
    #[error("an avalanche is already open")]
    AvalancheAlreadyOpen,

    /// A running total exceeded `u64::MAX`.
    #[error("arithmetic overflow in mass ledger")]
    ArithmeticOverflow,
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation law violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassAnomaly {
    /// Index of the avalanche, or `None` for a session-wide check.
    pub avalanche: Option<u64>,
    /// Mass the ledger expected to observe.
    pub expected: u64,
    /// Mass actually observed.
    pub actual: u64,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for MassAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
