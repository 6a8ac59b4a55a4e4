//! The session: explicit owner of one grid and everything attached to it.
//!
//! A [`Session`] bundles the grid, the rule, the threshold schedule, the
//! relaxation engine, the statistics recorder, the mass ledger, and a seeded
//! random number generator. Nothing is global: two sessions never share
//! state, and the same seed replays the same run.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use sandpile_grid::{Grid, GridError};
use sandpile_ledger::{ConservationResult, LedgerError, MassAnomaly, MassLedger};
use sandpile_types::{AvalancheRecord, Cell, SessionId};

use crate::config::{ConfigError, SimulationConfig};
use crate::driver::DropPolicy;
use crate::export::SessionExport;
use crate::recorder::{RecorderError, StatisticsRecorder};
use crate::relax::{RelaxError, RelaxationEngine};
use crate::rule::{RuleError, ToppleRule};
use crate::threshold::ThresholdSchedule;

/// Errors raised by session operations. All of them are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The rule could not be built.
    #[error("rule error: {source}")]
    Rule {
        /// The underlying rule error.
        #[from]
        source: RuleError,
    },

    /// A grid operation failed.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// An avalanche failed.
    #[error("relaxation error: {source}")]
    Relax {
        /// The underlying relaxation error.
        #[from]
        source: RelaxError,
    },

    /// The ledger rejected a drop.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// A label pointed at a missing avalanche.
    #[error("recorder error: {source}")]
    Recorder {
        /// The underlying recorder error.
        #[from]
        source: RecorderError,
    },

    /// The grid's mass disagrees with the session ledger.
    #[error("conservation violated: {0}")]
    Conservation(MassAnomaly),
}

/// One simulation run.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    grid: Grid,
    rule: ToppleRule,
    schedule: ThresholdSchedule,
    engine: RelaxationEngine,
    recorder: StatisticsRecorder,
    ledger: MassLedger,
    rng: StdRng,
}

impl Session {
    /// Build a session from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for invalid values,
    /// [`SessionError::Rule`] when the threshold or grid shape does not suit
    /// the rule, and [`SessionError::Grid`] when the grid cannot be built.
    pub fn new(config: &SimulationConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let dimensions = config.dimensions();
        let schedule = config.schedule();
        let rule = ToppleRule::new(config.rule.kind, &schedule, dimensions)?
            .with_metric(config.rule.metric());
        let grid = Grid::with_offset(dimensions.length, dimensions.width, config.grid.offset)?;
        let session = Self::from_parts(grid, rule, schedule, config.engine(), config.driver.seed);

        info!(
            session_id = %session.id,
            rule = %rule.kind(),
            dimensions = %dimensions,
            threshold = schedule.base(),
            seed = config.driver.seed,
            "Session created"
        );
        Ok(session)
    }

    /// Assemble a session from prepared parts. Used for fixed scenarios.
    pub fn from_parts(
        grid: Grid,
        rule: ToppleRule,
        schedule: ThresholdSchedule,
        engine: RelaxationEngine,
        seed: u64,
    ) -> Self {
        let ledger = MassLedger::new(grid.total_mass());
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            grid,
            rule,
            schedule,
            engine,
            recorder: StatisticsRecorder::new(),
            ledger,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // -----------------------------------------------------------------------
    // Perturbation
    // -----------------------------------------------------------------------

    /// Drop `amount` units on `cell`, or on a random cell when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Grid`] for an out-of-bounds cell.
    pub fn drop(&mut self, amount: u64, cell: Option<Cell>) -> Result<Cell, SessionError> {
        let hit = self.grid.drop(amount, cell, &mut self.rng)?;
        self.ledger.record_drop(amount)?;
        Ok(hit)
    }

    /// Drop according to a policy.
    ///
    /// # Errors
    ///
    /// See [`Self::drop`].
    pub fn drop_with(&mut self, policy: &DropPolicy) -> Result<Cell, SessionError> {
        let (amount, cell) = policy.sample(&mut self.rng);
        self.drop(amount, cell)
    }

    // -----------------------------------------------------------------------
    // Avalanches
    // -----------------------------------------------------------------------

    /// Cells that would topple at the current threshold.
    pub fn overloaded(&self) -> Vec<Cell> {
        self.rule.overloaded(&self.grid, self.threshold())
    }

    /// Whether no cell is overloaded.
    pub fn is_stable(&self) -> bool {
        self.overloaded().is_empty()
    }

    /// Run an avalanche if the grid is unstable and record it.
    ///
    /// Returns `Ok(None)` when the grid is already stable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Relax`] if relaxation fails and
    /// [`SessionError::Conservation`] if the session's mass no longer adds up.
    pub fn avalanche(&mut self) -> Result<Option<AvalancheRecord>, SessionError> {
        let record =
            self.engine
                .relax(&mut self.grid, &self.rule, &self.schedule, &mut self.ledger)?;
        self.finish(record)
    }

    /// Run an avalanche and attach `label` to its record. A label that is
    /// already in use moves to the new record.
    ///
    /// # Errors
    ///
    /// See [`Self::avalanche`].
    pub fn avalanche_labelled(
        &mut self,
        label: &str,
    ) -> Result<Option<AvalancheRecord>, SessionError> {
        let record = self.avalanche()?;
        if record.is_some() {
            let index = self.recorder.len().saturating_sub(1);
            self.recorder.label(label, index)?;
        }
        Ok(record)
    }

    /// Topple one uniformly random cell and relax whatever follows.
    ///
    /// This is how the randomized rule produces avalanches. The topple
    /// counts even when the chosen cell is empty.
    ///
    /// # Errors
    ///
    /// See [`Self::avalanche`].
    pub fn random_topple(&mut self) -> Result<Option<AvalancheRecord>, SessionError> {
        let dimensions = self.grid.dimensions();
        let cell = Cell::new(
            self.rng.random_range(0..dimensions.length),
            self.rng.random_range(0..dimensions.width),
        );
        let record = self.engine.relax_from(
            &mut self.grid,
            &self.rule,
            &self.schedule,
            &mut self.ledger,
            vec![cell],
            &mut self.rng,
        )?;
        self.finish(record)
    }

    fn finish(
        &mut self,
        record: Option<AvalancheRecord>,
    ) -> Result<Option<AvalancheRecord>, SessionError> {
        if let ConservationResult::Anomaly(anomaly) =
            self.ledger.verify_session(self.grid.total_mass())
        {
            warn!(
                session_id = %self.id,
                expected = anomaly.expected,
                actual = anomaly.actual,
                "{}",
                anomaly.message
            );
            return Err(SessionError::Conservation(anomaly));
        }
        if let Some(record) = record {
            self.recorder.push(record);
        }
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Threshold at the current time.
    pub fn threshold(&self) -> u64 {
        self.schedule.at(self.grid.time())
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The toppling rule.
    pub const fn rule(&self) -> &ToppleRule {
        &self.rule
    }

    /// The threshold schedule.
    pub const fn schedule(&self) -> &ThresholdSchedule {
        &self.schedule
    }

    /// The relaxation engine.
    pub const fn engine(&self) -> &RelaxationEngine {
        &self.engine
    }

    /// Recorded avalanches.
    pub const fn recorder(&self) -> &StatisticsRecorder {
        &self.recorder
    }

    /// Mass ledger.
    pub const fn ledger(&self) -> &MassLedger {
        &self.ledger
    }

    /// Snapshot of the session for export.
    pub fn export(&self) -> SessionExport {
        SessionExport::from_session(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sandpile_types::{Observable, RuleKind};

    use super::*;

    fn small_config(kind: RuleKind) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.grid.length = 5;
        config.grid.width = 5;
        config.rule.kind = kind;
        config
    }

    #[test]
    fn new_session_is_empty_and_stable() {
        let session = Session::new(&small_config(RuleKind::Orthogonal)).unwrap();
        assert_eq!(session.grid().total_mass(), 0);
        assert!(session.is_stable());
        assert!(session.recorder().is_empty());
        assert_eq!(session.threshold(), 4);
    }

    #[test]
    fn invalid_threshold_is_fatal() {
        let mut config = small_config(RuleKind::Radial);
        config.rule.threshold = Some(4);
        assert!(matches!(
            Session::new(&config),
            Err(SessionError::Rule { .. })
        ));
    }

    #[test]
    fn out_of_bounds_drop_is_fatal() {
        let mut session = Session::new(&small_config(RuleKind::Orthogonal)).unwrap();
        assert!(matches!(
            session.drop(1, Some(Cell::new(5, 5))),
            Err(SessionError::Grid { .. })
        ));
    }

    #[test]
    fn stable_grid_records_nothing() {
        let mut session = Session::new(&small_config(RuleKind::Orthogonal)).unwrap();
        session.drop(3, Some(Cell::new(2, 2))).unwrap();
        assert!(session.avalanche().unwrap().is_none());
        assert!(session.recorder().is_empty());
    }

    #[test]
    fn avalanche_is_recorded_and_labelled() {
        let mut session = Session::new(&small_config(RuleKind::Orthogonal)).unwrap();
        session.drop(4, Some(Cell::new(2, 2))).unwrap();
        let record = session.avalanche_labelled("first").unwrap().unwrap();
        assert_eq!(record.topples, 1);
        assert_eq!(session.recorder().len(), 1);
        assert_eq!(session.recorder().by_label("first"), Some(&record));
        assert_eq!(session.recorder().series(Observable::Topples), vec![1.0]);
    }

    #[test]
    fn random_topple_always_records() {
        let mut session = Session::new(&small_config(RuleKind::Randomized)).unwrap();
        let record = session.random_topple().unwrap().unwrap();
        assert_eq!(record.topples, 1);
        assert_eq!(record.lost_mass, 0);
        assert_eq!(session.recorder().len(), 1);
    }

    #[test]
    fn same_seed_same_run() {
        let config = small_config(RuleKind::Orthogonal);
        let mut a = Session::new(&config).unwrap();
        let mut b = Session::new(&config).unwrap();
        for _ in 0..50 {
            a.drop(1, None).unwrap();
            b.drop(1, None).unwrap();
            a.avalanche().unwrap();
            b.avalanche().unwrap();
        }
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.recorder().records(), b.recorder().records());
    }
}
