//! Error types for the command-line front end.
//!
//! Every library error surfaces through [`CliError`] so `main` can report
//! it in one place.

use sandpile_analysis::AnalysisError;
use sandpile_core::config::ConfigError;
use sandpile_core::export::ExportError;
use sandpile_core::session::SessionError;

/// Errors that end a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The configuration file could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The simulation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Writing or reading a session export failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// An analysis step could not run on the data.
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// The export has no series for the requested observable.
    #[error("export has no `{key}` series")]
    MissingSeries {
        /// Export key that was looked up.
        key: &'static str,
    },

    /// Encoding a report for stdout failed.
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
