//! The mass ledger: running totals and an append-only avalanche log.
//!
//! The [`MassLedger`] is the in-memory bookkeeping for one simulation
//! session. Drops are the only source of mass, dissipation off the grid edge
//! is the only sink, and topples are internal transfers that must balance.
//!
//! # Design
//!
//! - **Append-only**: closed avalanche summaries are never modified.
//! - **Per-topple balance**: a topple that does not balance is rejected
//!   before it reaches the totals.
//! - **Checked arithmetic**: every total uses checked addition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use sandpile_types::Cell;

use crate::LedgerError;
use crate::conservation::{self, ConservationResult};

// ---------------------------------------------------------------------------
// Flow records
// ---------------------------------------------------------------------------

/// Mass movement caused by one topple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToppleFlow {
    /// The toppled cell.
    pub origin: Cell,
    /// Units taken from the origin.
    pub removed: u64,
    /// Units credited to in-grid neighbors.
    pub delivered: u64,
    /// Units lost off the grid.
    pub dissipated: u64,
}

impl ToppleFlow {
    /// Create a flow record.
    pub const fn new(origin: Cell, removed: u64, delivered: u64, dissipated: u64) -> Self {
        Self {
            origin,
            removed,
            delivered,
            dissipated,
        }
    }

    /// Whether `removed == delivered + dissipated`.
    pub fn is_balanced(&self) -> bool {
        self.delivered.checked_add(self.dissipated) == Some(self.removed)
    }
}

/// Summed flows of one avalanche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvalancheFlows {
    /// Position of the avalanche in the session log (0-indexed).
    pub index: u64,
    /// Grid mass when the avalanche started.
    pub mass_before: u64,
    /// Grid mass when the avalanche ended.
    pub mass_after: u64,
    /// Number of topples recorded.
    pub topples: u64,
    /// Total units removed from toppled cells.
    pub removed: u64,
    /// Total units credited to in-grid neighbors.
    pub delivered: u64,
    /// Total units lost off the grid.
    pub dissipated: u64,
}

impl AvalancheFlows {
    const fn open(index: u64, mass_before: u64) -> Self {
        Self {
            index,
            mass_before,
            mass_after: mass_before,
            topples: 0,
            removed: 0,
            delivered: 0,
            dissipated: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Mass bookkeeping for one session.
#[derive(Debug, Clone, Default)]
pub struct MassLedger {
    /// Grid mass when the session started (e.g. a configured offset).
    initial_mass: u64,
    /// Total units dropped onto the grid.
    dropped: u64,
    /// Number of drop operations.
    drops: u64,
    /// Total units dissipated across all closed avalanches.
    dissipated: u64,
    /// Closed avalanche summaries, in order.
    history: Vec<AvalancheFlows>,
    /// The avalanche currently being relaxed, if any.
    open: Option<AvalancheFlows>,
}

impl MassLedger {
    /// Create a ledger for a grid that starts with `initial_mass` units.
    pub const fn new(initial_mass: u64) -> Self {
        Self {
            initial_mass,
            dropped: 0,
            drops: 0,
            dissipated: 0,
            history: Vec::new(),
            open: None,
        }
    }

    /// Record `amount` units dropped onto the grid.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ArithmeticOverflow`] if the running total
    /// would exceed `u64::MAX`.
    pub fn record_drop(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.dropped = self
            .dropped
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.drops = self.drops.saturating_add(1);
        Ok(())
    }

    /// Open a new avalanche starting at `mass_before`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AvalancheAlreadyOpen`] if the previous
    /// avalanche was never closed.
    pub fn begin_avalanche(&mut self, mass_before: u64) -> Result<(), LedgerError> {
        if self.open.is_some() {
            return Err(LedgerError::AvalancheAlreadyOpen);
        }
        let index = u64::try_from(self.history.len())
            .map_err(|_err| LedgerError::ArithmeticOverflow)?;
        self.open = Some(AvalancheFlows::open(index, mass_before));
        Ok(())
    }

    /// Record one topple of the open avalanche.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnbalancedTopple`] if the flow does not
    /// balance, [`LedgerError::NoOpenAvalanche`] if no avalanche is open.
    pub fn record_topple(&mut self, flow: &ToppleFlow) -> Result<(), LedgerError> {
        if !flow.is_balanced() {
            return Err(LedgerError::UnbalancedTopple {
                origin: flow.origin,
                removed: flow.removed,
                delivered: flow.delivered,
                dissipated: flow.dissipated,
            });
        }
        let open = self.open.as_mut().ok_or(LedgerError::NoOpenAvalanche)?;
        open.topples = open
            .topples
            .checked_add(1)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        open.removed = open
            .removed
            .checked_add(flow.removed)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        open.delivered = open
            .delivered
            .checked_add(flow.delivered)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        open.dissipated = open
            .dissipated
            .checked_add(flow.dissipated)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Close the open avalanche at `mass_after` and append it to the log.
    ///
    /// The summary is returned even when it does not conserve mass; call
    /// [`conservation::verify_avalanche`] (or [`Self::verify_last`]) to check.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoOpenAvalanche`] if no avalanche is open.
    pub fn close_avalanche(&mut self, mass_after: u64) -> Result<AvalancheFlows, LedgerError> {
        let mut flows = self.open.take().ok_or(LedgerError::NoOpenAvalanche)?;
        flows.mass_after = mass_after;
        self.dissipated = self
            .dissipated
            .checked_add(flows.dissipated)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.history.push(flows);
        debug!(
            index = flows.index,
            topples = flows.topples,
            dissipated = flows.dissipated,
            "avalanche flows closed"
        );
        Ok(flows)
    }

    /// Verify the most recently closed avalanche.
    pub fn verify_last(&self) -> ConservationResult {
        self.history
            .last()
            .map_or(ConservationResult::Balanced, conservation::verify_avalanche)
    }

    /// Verify the session-wide law against the grid's current mass.
    pub fn verify_session(&self, current_mass: u64) -> ConservationResult {
        conservation::verify_session(
            self.initial_mass,
            self.dropped,
            self.dissipated,
            current_mass,
        )
    }

    /// Grid mass at session start.
    pub const fn initial_mass(&self) -> u64 {
        self.initial_mass
    }

    /// Total units dropped.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of drop operations.
    pub const fn drops(&self) -> u64 {
        self.drops
    }

    /// Total units dissipated across closed avalanches.
    pub const fn dissipated(&self) -> u64 {
        self.dissipated
    }

    /// Whether an avalanche is currently open.
    pub const fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Closed avalanche summaries, in order.
    pub fn history(&self) -> &[AvalancheFlows] {
        &self.history
    }
}
