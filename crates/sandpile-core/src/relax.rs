//! The relaxation engine: one avalanche from first topple to stability.
//!
//! # Wave loop
//!
//! 1. Snapshot the overloaded cells at the current threshold. An empty
//!    snapshot means the grid is stable and no avalanche happens.
//! 2. Topple every snapshot cell exactly once, in row-major order, even if
//!    neighbors' topples raised it further during the wave.
//! 3. Advance time according to the [`TimePolicy`].
//! 4. Take the next snapshot and repeat until it is empty.
//!
//! Every topple goes through [`Grid::apply`] and is recorded in the
//! [`MassLedger`]. When the grid settles, the ledger verifies that the mass
//! the grid lost is exactly what the topples sent off the edge.

use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, warn};

use sandpile_grid::{Grid, GridError, Redistribution};
use sandpile_ledger::conservation::{self, ConservationResult};
use sandpile_ledger::{LedgerError, MassAnomaly, MassLedger, ToppleFlow};
use sandpile_types::{AvalancheRecord, Cell, DistanceMetric, TimePolicy};

use crate::rule::{RuleError, ToppleRule};
use crate::threshold::ThresholdSchedule;

/// Errors raised while relaxing the grid.
#[derive(Debug, thiserror::Error)]
pub enum RelaxError {
    /// A rule failed to describe a topple.
    #[error("rule error: {source}")]
    Rule {
        /// The underlying rule error.
        #[from]
        source: RuleError,
    },

    /// The grid rejected a redistribution.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// The ledger rejected a flow.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// Mass was created or destroyed during the avalanche.
    #[error("conservation violated: {0}")]
    Conservation(MassAnomaly),

    /// The wave ceiling was reached before the grid settled.
    #[error("grid did not stabilize within {waves} waves")]
    DidNotStabilize {
        /// Waves run before giving up.
        waves: u64,
    },
}

/// Runs avalanches to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaxationEngine {
    /// When elapsed time advances during an avalanche.
    pub policy: TimePolicy,
    /// Optional ceiling on the number of waves per avalanche.
    pub max_waves: Option<u64>,
}

impl RelaxationEngine {
    /// Create an engine with the given time policy and no wave ceiling.
    pub const fn new(policy: TimePolicy) -> Self {
        Self {
            policy,
            max_waves: None,
        }
    }

    /// Set a wave ceiling.
    #[must_use]
    pub const fn with_max_waves(mut self, max_waves: Option<u64>) -> Self {
        self.max_waves = max_waves;
        self
    }

    /// Relax the grid if any cell is overloaded.
    ///
    /// Returns `Ok(None)` when the grid is already stable; no time passes
    /// and nothing is recorded.
    ///
    /// # Errors
    ///
    /// See [`RelaxError`]. Every error is fatal for the session.
    pub fn relax(
        &self,
        grid: &mut Grid,
        rule: &ToppleRule,
        schedule: &ThresholdSchedule,
        ledger: &mut MassLedger,
    ) -> Result<Option<AvalancheRecord>, RelaxError> {
        let first_wave = rule.overloaded(grid, schedule.at(grid.time()));
        self.run(grid, rule, schedule, ledger, first_wave, |grid, cell, threshold| {
            rule.topple(grid, cell, threshold)
        })
    }

    /// Relax the grid starting from an externally chosen first wave.
    ///
    /// Later waves come from the rule as usual. Used for the randomized
    /// rule, whose cells never overload on their own; `rng` decides which
    /// neighbors a partly filled cell feeds.
    ///
    /// # Errors
    ///
    /// See [`RelaxError`].
    pub fn relax_from<R: Rng + ?Sized>(
        &self,
        grid: &mut Grid,
        rule: &ToppleRule,
        schedule: &ThresholdSchedule,
        ledger: &mut MassLedger,
        first_wave: Vec<Cell>,
        rng: &mut R,
    ) -> Result<Option<AvalancheRecord>, RelaxError> {
        self.run(grid, rule, schedule, ledger, first_wave, |grid, cell, threshold| {
            rule.topple_shuffled(grid, cell, threshold, &mut *rng)
        })
    }

    fn run<F>(
        &self,
        grid: &mut Grid,
        rule: &ToppleRule,
        schedule: &ThresholdSchedule,
        ledger: &mut MassLedger,
        first_wave: Vec<Cell>,
        mut topple: F,
    ) -> Result<Option<AvalancheRecord>, RelaxError>
    where
        F: FnMut(&Grid, Cell, u64) -> Result<Redistribution, RuleError>,
    {
        if first_wave.is_empty() {
            return Ok(None);
        }

        let start_time = grid.time();
        let mass_before = grid.total_mass();
        ledger.begin_avalanche(mass_before)?;

        let mut tally = AvalancheTally::default();
        let mut wave = first_wave;
        while !wave.is_empty() {
            if self.max_waves.is_some_and(|limit| tally.waves >= limit) {
                ledger.close_avalanche(grid.total_mass())?;
                warn!(waves = tally.waves, "avalanche hit the wave ceiling");
                return Err(RelaxError::DidNotStabilize { waves: tally.waves });
            }

            for cell in wave {
                let redistribution = topple(grid, cell, schedule.at(grid.time()))?;
                grid.apply(&redistribution)?;
                ledger.record_topple(&flow_of(&redistribution)?)?;
                tally.record(cell);
                if self.policy == TimePolicy::PerTopple {
                    grid.advance_time();
                }
            }
            tally.waves = tally.waves.saturating_add(1);
            if self.policy == TimePolicy::PerWave {
                grid.advance_time();
            }

            wave = rule.overloaded(grid, schedule.at(grid.time()));
        }

        let mass_after = grid.total_mass();
        let flows = ledger.close_avalanche(mass_after)?;
        if let ConservationResult::Anomaly(anomaly) = conservation::verify_avalanche(&flows) {
            warn!(
                expected = anomaly.expected,
                actual = anomaly.actual,
                "{}",
                anomaly.message
            );
            return Err(RelaxError::Conservation(anomaly));
        }

        let record = tally.finish(
            grid.time().saturating_sub(start_time),
            mass_before.saturating_sub(mass_after),
            rule.metric(),
        );
        if let Some(record) = &record {
            debug!(
                duration = record.duration,
                topples = record.topples,
                area = record.area,
                lost_mass = record.lost_mass,
                extent = record.extent,
                "avalanche settled"
            );
        }
        Ok(record)
    }
}

/// Convert a redistribution into the ledger's flow record.
fn flow_of(redistribution: &Redistribution) -> Result<ToppleFlow, RelaxError> {
    let delivered = redistribution
        .delivered()
        .ok_or(RelaxError::Grid {
            source: GridError::MassOverflow,
        })?;
    Ok(ToppleFlow::new(
        redistribution.origin,
        redistribution.removed,
        delivered,
        redistribution.dissipated,
    ))
}

// ---------------------------------------------------------------------------
// Running tally
// ---------------------------------------------------------------------------

/// Per-avalanche accumulator.
#[derive(Debug, Default)]
struct AvalancheTally {
    origin: Option<Cell>,
    topples: u64,
    waves: u64,
    toppled: BTreeSet<Cell>,
}

impl AvalancheTally {
    fn record(&mut self, cell: Cell) {
        self.origin.get_or_insert(cell);
        self.topples = self.topples.saturating_add(1);
        self.toppled.insert(cell);
    }

    /// Build the record. `None` if nothing toppled.
    fn finish(
        self,
        duration: u64,
        lost_mass: u64,
        metric: DistanceMetric,
    ) -> Option<AvalancheRecord> {
        let origin = self.origin?;
        let extent = self
            .toppled
            .iter()
            .map(|&cell| origin.distance(cell, metric))
            .fold(0.0_f64, f64::max);
        Some(AvalancheRecord {
            duration,
            topples: self.topples,
            area: u64::try_from(self.toppled.len()).unwrap_or(u64::MAX),
            lost_mass,
            extent,
            origin,
            waves: self.waves,
        })
    }
}
