//! `sandpile run`: record avalanches and export the session.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use sandpile_core::config::SimulationConfig;
use sandpile_core::driver::{Driver, LogProgress};
use sandpile_core::session::Session;
use sandpile_types::{AvalancheRecord, Dimensions, RuleKind, SessionId};

use crate::cli::RunArgs;
use crate::error::CliError;

/// Summary printed on stdout when a run finishes.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Session identifier.
    pub session: SessionId,
    /// Rule variant.
    pub rule: RuleKind,
    /// Grid dimensions.
    pub dimensions: Dimensions,
    /// Avalanches recorded.
    pub avalanches: u64,
    /// Drops made.
    pub drops: u64,
    /// Elapsed time steps.
    pub time_elapsed: u64,
    /// Mass on the grid at the end.
    pub mass: u64,
    /// Mass lost off the edges over the whole run.
    pub dissipated: u64,
    /// Threshold at the end of the run.
    pub threshold: u64,
    /// The last avalanche.
    pub last: Option<AvalancheRecord>,
    /// Where the export was written, if anywhere.
    pub export: Option<PathBuf>,
}

/// Load the config file (if any), apply flag overrides, and validate.
pub fn load_config(args: &RunArgs) -> Result<SimulationConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Run the configured number of avalanches.
pub fn execute(config: &SimulationConfig) -> Result<RunReport, CliError> {
    let mut session = Session::new(config)?;
    let driver = Driver::new(config.driver.drop.policy(config.dimensions()));
    let mut progress = LogProgress::new(config.logging.progress_interval, config.driver.avalanches);
    let summary = driver.run(&mut session, config.driver.avalanches, &mut progress)?;

    if let Some(path) = &config.export.path {
        session.export().write(path)?;
    }

    let report = RunReport {
        session: session.id(),
        rule: session.rule().kind(),
        dimensions: session.grid().dimensions(),
        avalanches: summary.avalanches,
        drops: summary.drops,
        time_elapsed: session.grid().time(),
        mass: session.grid().total_mass(),
        dissipated: session.ledger().dissipated(),
        threshold: session.threshold(),
        last: summary.last,
        export: config.export.path.clone(),
    };
    info!(
        session_id = %report.session,
        avalanches = report.avalanches,
        drops = report.drops,
        "Run finished"
    );
    Ok(report)
}
