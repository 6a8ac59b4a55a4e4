//! JSON snapshot of a session.
//!
//! The export carries the final grid, the clock and mass history, every
//! avalanche record, and the five observable series under their
//! human-readable keys (`Duration`, `Topples`, `Area`, `Lost mass`, and
//! `Distance` or `Radius` depending on the metric). All series have the
//! same length.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use sandpile_types::{AvalancheRecord, Dimensions, DistanceMetric, Observable, RuleKind, SessionId};

use crate::session::Session;
use crate::threshold::ThresholdSchedule;

/// Errors raised while writing or reading an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Failed to read or write the export file.
    #[error("export I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to encode or decode JSON.
    #[error("export JSON failed: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    /// Session identifier.
    #[serde(rename = "Session")]
    pub session: SessionId,
    /// When the session was created.
    #[serde(rename = "Created At")]
    pub created_at: DateTime<Utc>,
    /// When this export was taken.
    #[serde(rename = "Exported At")]
    pub exported_at: DateTime<Utc>,
    /// Rule variant.
    #[serde(rename = "Rule")]
    pub rule: RuleKind,
    /// Extent metric.
    #[serde(rename = "Metric")]
    pub metric: DistanceMetric,
    /// Grid dimensions.
    #[serde(rename = "Dimensions")]
    pub dimensions: Dimensions,
    /// Threshold at export time.
    #[serde(rename = "Threshold")]
    pub threshold: u64,
    /// Threshold schedule.
    #[serde(rename = "Threshold Schedule")]
    pub schedule: ThresholdSchedule,
    /// Elapsed time steps.
    #[serde(rename = "Time Elapsed")]
    pub time_elapsed: u64,
    /// Total mass after each time step.
    #[serde(rename = "Mass History")]
    pub mass_history: Vec<u64>,
    /// Final grid, row by row.
    #[serde(rename = "Grid")]
    pub grid: Vec<Vec<u64>>,
    /// Every avalanche record, oldest first.
    #[serde(rename = "Avalanches")]
    pub avalanches: Vec<AvalancheRecord>,
    /// Labelled avalanches: label to index in `avalanches`.
    #[serde(rename = "Labels", default)]
    pub labels: BTreeMap<String, usize>,
    /// Observable series keyed by export name.
    #[serde(flatten)]
    pub series: BTreeMap<String, Vec<f64>>,
}

impl SessionExport {
    /// Snapshot a session now.
    pub fn from_session(session: &Session) -> Self {
        let metric = session.rule().metric();
        let grid = session.grid();
        Self {
            session: session.id(),
            created_at: session.created_at(),
            exported_at: Utc::now(),
            rule: session.rule().kind(),
            metric,
            dimensions: grid.dimensions(),
            threshold: session.threshold(),
            schedule: *session.schedule(),
            time_elapsed: grid.time(),
            mass_history: grid.mass_history().to_vec(),
            grid: grid.rows(),
            avalanches: session.recorder().records().to_vec(),
            labels: session.recorder().labels().clone(),
            series: session.recorder().all_series(metric),
        }
    }

    /// One observable series.
    pub fn series(&self, observable: Observable) -> Option<&[f64]> {
        self.series
            .get(observable.key(self.metric))
            .map(Vec::as_slice)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if encoding fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode an export from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the export to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if encoding or writing fails.
    pub fn write(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, self.to_json()?)?;
        info!(
            path = %path.display(),
            avalanches = self.avalanches.len(),
            "Export written"
        );
        Ok(())
    }

    /// Read an export from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if reading or decoding fails.
    pub fn read(path: &Path) -> Result<Self, ExportError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sandpile_types::Cell;

    use super::*;
    use crate::config::SimulationConfig;

    fn session_with_avalanches(kind: RuleKind) -> Session {
        let mut config = SimulationConfig::default();
        config.grid.length = 5;
        config.grid.width = 5;
        config.rule.kind = kind;
        let mut session = Session::new(&config).unwrap();
        let threshold = session.threshold();
        session.drop(threshold, Some(Cell::new(0, 0))).unwrap();
        session.avalanche_labelled("corner").unwrap();
        session.drop(threshold, Some(Cell::new(2, 2))).unwrap();
        session.avalanche().unwrap();
        session
    }

    #[test]
    fn export_uses_readable_keys() {
        let session = session_with_avalanches(RuleKind::Orthogonal);
        let json = session.export().to_json().unwrap();
        for key in [
            "\"Session\"",
            "\"Exported At\"",
            "\"Dimensions\"",
            "\"Threshold\"",
            "\"Time Elapsed\"",
            "\"Mass History\"",
            "\"Grid\"",
            "\"Duration\"",
            "\"Topples\"",
            "\"Area\"",
            "\"Lost mass\"",
            "\"Distance\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
        assert!(!json.contains("\"Radius\""));
    }

    #[test]
    fn radius_key_for_euclidean_rules() {
        let session = session_with_avalanches(RuleKind::Radial);
        let export = session.export();
        assert!(export.series.contains_key("Radius"));
        assert!(!export.series.contains_key("Distance"));
    }

    #[test]
    fn series_have_equal_length_and_survive_json() {
        let session = session_with_avalanches(RuleKind::Orthogonal);
        let export = session.export();
        assert_eq!(export.avalanches.len(), 2);
        assert!(export.series.values().all(|s| s.len() == 2));
        assert_eq!(export.labels.get("corner"), Some(&0));
        assert_eq!(
            export.mass_history.len(),
            usize::try_from(export.time_elapsed).unwrap()
        );

        let decoded = SessionExport::from_json(&export.to_json().unwrap()).unwrap();
        assert_eq!(decoded.series(Observable::Topples), export.series(Observable::Topples));
        assert_eq!(decoded.grid, export.grid);
        assert_eq!(decoded.metric, DistanceMetric::Manhattan);
    }
}
