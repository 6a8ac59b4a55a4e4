//! Append-only statistics recorder.
//!
//! Every completed avalanche is pushed once and never edited. The five
//! observable series (duration, topples, area, lost mass, extent) are views
//! over the same record log, so they always have the same length.

use std::collections::BTreeMap;

use sandpile_types::{AvalancheRecord, DistanceMetric, Observable};

/// Errors raised by the recorder.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// A label pointed at an avalanche that was never recorded.
    #[error("no avalanche at index {index} (recorded: {len})")]
    UnknownIndex {
        /// The requested index.
        index: usize,
        /// Number of recorded avalanches.
        len: usize,
    },
}

/// Log of avalanche records with optional labels.
#[derive(Debug, Clone, Default)]
pub struct StatisticsRecorder {
    records: Vec<AvalancheRecord>,
    labels: BTreeMap<String, usize>,
}

impl StatisticsRecorder {
    /// An empty recorder.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Append a record and return its index.
    pub fn push(&mut self, record: AvalancheRecord) -> usize {
        self.records.push(record);
        self.records.len().saturating_sub(1)
    }

    /// Attach `name` to the record at `index`. A label that already exists
    /// is moved to the new index; the earlier record stays in the log.
    pub fn label(&mut self, name: impl Into<String>, index: usize) -> Result<(), RecorderError> {
        if index >= self.records.len() {
            return Err(RecorderError::UnknownIndex {
                index,
                len: self.records.len(),
            });
        }
        self.labels.insert(name.into(), index);
        Ok(())
    }

    /// The record a label points at.
    pub fn by_label(&self, name: &str) -> Option<&AvalancheRecord> {
        self.labels.get(name).and_then(|&index| self.records.get(index))
    }

    /// All labels and the indices they point at.
    pub const fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    /// Record at `index`.
    pub fn get(&self, index: usize) -> Option<&AvalancheRecord> {
        self.records.get(index)
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&AvalancheRecord> {
        self.records.last()
    }

    /// Number of recorded avalanches.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[AvalancheRecord] {
        &self.records
    }

    /// One observable across all records, oldest first.
    pub fn series(&self, observable: Observable) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.observable(observable))
            .collect()
    }

    /// Every observable series keyed by its export name.
    pub fn all_series(&self, metric: DistanceMetric) -> BTreeMap<String, Vec<f64>> {
        Observable::ALL
            .iter()
            .map(|&observable| (observable.key(metric).to_owned(), self.series(observable)))
            .collect()
    }
}
