//! The avalanche loop: drop until something topples, then relax.
//!
//! The [`Driver`] repeats that cycle until the requested number of
//! avalanches has been recorded, reporting each one to a
//! [`ProgressObserver`].

use rand::Rng;
use tracing::{debug, info};

use sandpile_types::{AvalancheRecord, Cell, Dimensions, RuleKind};

use crate::session::{Session, SessionError};

// ---------------------------------------------------------------------------
// Drop policy
// ---------------------------------------------------------------------------

/// Where drops land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A uniformly random cell of the grid.
    Random,
    /// Always the same cell.
    Cell(Cell),
    /// Uniformly among a list of cells. An empty list falls back to
    /// [`DropTarget::Random`].
    AnyOf(Vec<Cell>),
}

/// How many units each drop adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAmount {
    /// Always `n` units.
    Fixed(u64),
    /// Uniform in `min..=max`.
    Uniform {
        /// Smallest amount.
        min: u64,
        /// Largest amount.
        max: u64,
    },
}

/// Drop site plus drop amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPolicy {
    /// Where drops land.
    pub target: DropTarget,
    /// How much each drop adds.
    pub amount: DropAmount,
}

impl Default for DropPolicy {
    fn default() -> Self {
        Self {
            target: DropTarget::Random,
            amount: DropAmount::Fixed(1),
        }
    }
}

impl DropPolicy {
    /// Single grains on the centre cell.
    pub const fn centre(dimensions: Dimensions) -> Self {
        Self {
            target: DropTarget::Cell(dimensions.centre()),
            amount: DropAmount::Fixed(1),
        }
    }

    /// Single grains on cells strictly above and left of the centre cell.
    /// Grids too small to have such cells use the centre cell.
    pub fn top_left_quarter(dimensions: Dimensions) -> Self {
        let centre = dimensions.centre();
        let cells: Vec<Cell> = (0..centre.row)
            .flat_map(|row| (0..centre.col).map(move |col| Cell::new(row, col)))
            .collect();
        let target = if cells.is_empty() {
            DropTarget::Cell(centre)
        } else {
            DropTarget::AnyOf(cells)
        };
        Self {
            target,
            amount: DropAmount::Fixed(1),
        }
    }

    /// Draw one drop: the amount and the target cell (`None` for a random
    /// cell chosen by the grid).
    pub fn sample(&self, rng: &mut impl Rng) -> (u64, Option<Cell>) {
        let amount = match self.amount {
            DropAmount::Fixed(n) => n,
            DropAmount::Uniform { min, max } => rng.random_range(min.min(max)..=max.max(min)),
        };
        let cell = match &self.target {
            DropTarget::Random => None,
            DropTarget::Cell(cell) => Some(*cell),
            DropTarget::AnyOf(cells) if cells.is_empty() => None,
            DropTarget::AnyOf(cells) => cells.get(rng.random_range(0..cells.len())).copied(),
        };
        (amount, cell)
    }
}

// ---------------------------------------------------------------------------
// Progress callbacks
// ---------------------------------------------------------------------------

/// Callback invoked after each recorded avalanche.
pub trait ProgressObserver {
    /// Called with the avalanche's index in the session log.
    fn on_avalanche(&mut self, index: usize, record: &AvalancheRecord, session: &Session);
}

/// A no-op observer.
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {
    fn on_avalanche(&mut self, _index: usize, _record: &AvalancheRecord, _session: &Session) {}
}

/// Logs a progress line every `interval` avalanches.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    interval: usize,
    total: u64,
}

impl LogProgress {
    /// Log every `interval` avalanches out of `total`.
    pub fn new(interval: u64, total: u64) -> Self {
        Self {
            interval: usize::try_from(interval.max(1)).unwrap_or(usize::MAX),
            total,
        }
    }
}

impl ProgressObserver for LogProgress {
    fn on_avalanche(&mut self, index: usize, record: &AvalancheRecord, session: &Session) {
        let done = index.saturating_add(1);
        if done.checked_rem(self.interval) == Some(0) {
            info!(
                avalanches = done,
                total = self.total,
                time = session.grid().time(),
                mass = session.grid().total_mass(),
                topples = record.topples,
                "Progress"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Outcome of [`Driver::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Avalanches recorded during the run.
    pub avalanches: u64,
    /// Drops made during the run.
    pub drops: u64,
    /// The last avalanche, if any.
    pub last: Option<AvalancheRecord>,
}

/// Drives a session through repeated drop-and-relax cycles.
#[derive(Debug, Clone, Default)]
pub struct Driver {
    policy: DropPolicy,
}

impl Driver {
    /// A driver that drops according to `policy`.
    pub const fn new(policy: DropPolicy) -> Self {
        Self { policy }
    }

    /// The drop policy.
    pub const fn policy(&self) -> &DropPolicy {
        &self.policy
    }

    /// Drop until some cell is overloaded, then run the avalanche.
    ///
    /// For the randomized rule every cycle is one drop followed by one
    /// random topple. Returns the record and the number of drops made.
    ///
    /// # Errors
    ///
    /// Propagates every [`SessionError`].
    pub fn run_until_avalanche(
        &self,
        session: &mut Session,
    ) -> Result<(AvalancheRecord, u64), SessionError> {
        let mut drops: u64 = 0;
        if session.rule().kind() == RuleKind::Randomized {
            session.drop_with(&self.policy)?;
            drops = drops.saturating_add(1);
            if let Some(record) = session.random_topple()? {
                return Ok((record, drops));
            }
        }
        loop {
            if let Some(record) = session.avalanche()? {
                return Ok((record, drops));
            }
            session.drop_with(&self.policy)?;
            drops = drops.saturating_add(1);
        }
    }

    /// Record `requests` avalanches.
    ///
    /// # Errors
    ///
    /// Stops at the first [`SessionError`].
    pub fn run(
        &self,
        session: &mut Session,
        requests: u64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary, SessionError> {
        info!(
            session_id = %session.id(),
            requests,
            rule = %session.rule().kind(),
            "Run starting"
        );

        let mut summary = RunSummary {
            avalanches: 0,
            drops: 0,
            last: None,
        };
        while summary.avalanches < requests {
            let (record, drops) = self.run_until_avalanche(session)?;
            summary.avalanches = summary.avalanches.saturating_add(1);
            summary.drops = summary.drops.saturating_add(drops);
            summary.last = Some(record);

            let index = session.recorder().len().saturating_sub(1);
            debug!(
                index,
                drops,
                duration = record.duration,
                topples = record.topples,
                area = record.area,
                "Avalanche recorded"
            );
            observer.on_avalanche(index, &record, session);
        }

        info!(
            avalanches = summary.avalanches,
            drops = summary.drops,
            time = session.grid().time(),
            mass = session.grid().total_mass(),
            "Run complete"
        );
        Ok(summary)
    }
}
