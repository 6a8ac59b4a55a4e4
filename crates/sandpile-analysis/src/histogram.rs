//! Frequency tables and fixed-bin histograms.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::AnalysisError;

/// Bin count used when the caller does not pick one.
pub const DEFAULT_BINS: usize = 25;

/// Distinct values of `series` in ascending order, each with the number of
/// times it occurs.
///
/// # Errors
///
/// Returns [`AnalysisError::NonFinite`] if the series contains NaN or an
/// infinity.
pub fn frequencies(series: &[f64]) -> Result<Vec<(f64, u64)>, AnalysisError> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }
    let mut sorted = series.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut table: Vec<(f64, u64)> = Vec::new();
    for value in sorted {
        match table.last_mut() {
            Some((last, count)) if last.total_cmp(&value) == Ordering::Equal => {
                *count = count.saturating_add(1);
            }
            _ => table.push((value, 1)),
        }
    }
    Ok(table)
}

/// Equal-width histogram over the range of the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin edges, one more than the number of bins.
    pub edges: Vec<f64>,
    /// Per-bin heights: raw counts, or densities when requested.
    pub heights: Vec<f64>,
    /// Whether `heights` are normalised so that they integrate to one.
    pub density: bool,
}

impl Histogram {
    /// Number of bins.
    pub fn bins(&self) -> usize {
        self.heights.len()
    }

    /// Centre of each bin.
    pub fn centres(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|pair| match pair {
                [lo, hi] => (lo + hi) / 2.0,
                _ => f64::NAN,
            })
            .collect()
    }
}

/// Bin `series` into `bins` equal-width bins spanning its minimum to its
/// maximum. Every bin is half-open except the last, which includes the
/// maximum. A series with a single distinct value `v` spans
/// `v - 0.5 ..= v + 0.5`.
///
/// With `density` the heights are divided by `n * bin_width`.
///
/// # Errors
///
/// Returns [`AnalysisError::NoBins`] for zero bins,
/// [`AnalysisError::InsufficientData`] for an empty series and
/// [`AnalysisError::NonFinite`] for NaN or infinite values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::arithmetic_side_effects
)]
pub fn histogram(series: &[f64], bins: usize, density: bool) -> Result<Histogram, AnalysisError> {
    if bins == 0 {
        return Err(AnalysisError::NoBins);
    }
    if series.is_empty() {
        return Err(AnalysisError::InsufficientData {
            needed: 1,
            got: 0,
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }

    let (mut lo, mut hi) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if hi - lo <= 0.0 {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let last = bins - 1;
    let mut counts = vec![0_u64; bins];
    for &value in series {
        let slot = (((value - lo) / width).floor() as usize).min(last);
        if let Some(count) = counts.get_mut(slot) {
            *count += 1;
        }
    }

    let norm = if density {
        series.len() as f64 * width
    } else {
        1.0
    };
    let heights = counts.into_iter().map(|c| c as f64 / norm).collect();
    Ok(Histogram {
        edges,
        heights,
        density,
    })
}
