//! Power-law fit of an observable's frequency distribution.
//!
//! The series is reduced to its distinct values and their counts, both are
//! moved to `log10`, and a line is fitted through the result. A cut point
//! in log space splits the fit in two, which separates the scale-free
//! regime from the finite-size cutoff.
//!
//! Zero values carry no information on log axes (an avalanche with zero
//! area never happened), so they are dropped before fitting.

use serde::Serialize;

use crate::error::AnalysisError;
use crate::histogram::frequencies;
use crate::regression::{Regression, linear_regression, log10_all};

/// One or two fitted segments, in order of increasing value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerLawFit {
    /// `log10` cut the segments were split at, if any.
    pub cut: Option<f64>,
    /// Fitted segments. One without a cut, two with one.
    pub segments: Vec<Regression>,
}

impl PowerLawFit {
    /// Exponent of the first segment.
    pub fn exponent(&self) -> Option<f64> {
        self.segments.first().map(|s| s.slope)
    }
}

/// Fit `count ~ value^slope` over the frequencies of `series`.
///
/// Without `cut` this is a single regression of `log10 count` on
/// `log10 value`. With `cut` (a `log10` value) the points split into
/// `log10 value < cut` and `log10 value >= cut`, and each side is fitted
/// on its own.
///
/// # Errors
///
/// Returns [`AnalysisError::NonFinite`] for NaN or infinite values, and
/// [`AnalysisError::InsufficientData`] or [`AnalysisError::ZeroVariance`]
/// when a segment has fewer than two distinct positive values.
pub fn powerlaw_fit(series: &[f64], cut: Option<f64>) -> Result<PowerLawFit, AnalysisError> {
    let table: Vec<(f64, u64)> = frequencies(series)?
        .into_iter()
        .filter(|(value, _)| *value > 0.0)
        .collect();

    let values: Vec<f64> = table.iter().map(|(v, _)| *v).collect();
    #[allow(clippy::cast_precision_loss)]
    let counts: Vec<f64> = table.iter().map(|(_, c)| *c as f64).collect();
    let log_x = log10_all(&values)?;
    let log_y = log10_all(&counts)?;

    let segments = match cut {
        None => vec![linear_regression(&log_x, &log_y)?],
        Some(cut) => {
            let (below, above): (Vec<(f64, f64)>, Vec<(f64, f64)>) = log_x
                .iter()
                .copied()
                .zip(log_y.iter().copied())
                .partition(|(x, _)| *x < cut);
            vec![fit_pairs(&below)?, fit_pairs(&above)?]
        }
    };
    Ok(PowerLawFit { cut, segments })
}

fn fit_pairs(pairs: &[(f64, f64)]) -> Result<Regression, AnalysisError> {
    let (x, y): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
    linear_regression(&x, &y)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    /// A series in which value `x` occurs `round(10000 * x^-1.5)` times.
    fn synthetic_series() -> Vec<f64> {
        (1..=30_u32)
            .flat_map(|x| {
                let x = f64::from(x);
                let count = (10_000.0 * x.powf(-1.5)).round() as usize;
                std::iter::repeat_n(x, count)
            })
            .collect()
    }

    #[test]
    fn recovers_exponent_of_synthetic_counts() {
        let fit = powerlaw_fit(&synthetic_series(), None).unwrap();
        assert_eq!(fit.segments.len(), 1);
        let segment = fit.segments[0];
        assert!((segment.slope + 1.5).abs() < 0.01, "slope {}", segment.slope);
        assert!((segment.intercept - 4.0).abs() < 0.01);
        assert!(segment.r_value < -0.999);
        assert_eq!(segment.points, 30);
    }

    #[test]
    fn cut_splits_into_two_segments() {
        let fit = powerlaw_fit(&synthetic_series(), Some(1.0)).unwrap();
        assert_eq!(fit.segments.len(), 2);
        assert_eq!(fit.segments[0].points, 9);
        assert_eq!(fit.segments[1].points, 21);
        for segment in &fit.segments {
            assert!((segment.slope + 1.5).abs() < 0.05);
        }
    }

    #[test]
    fn zeros_are_ignored() {
        let mut series = synthetic_series();
        series.extend(std::iter::repeat_n(0.0, 500));
        let with_zeros = powerlaw_fit(&series, None).unwrap();
        let without = powerlaw_fit(&synthetic_series(), None).unwrap();
        assert_eq!(with_zeros, without);
    }

    #[test]
    fn too_few_distinct_values_is_an_error() {
        assert!(matches!(
            powerlaw_fit(&[2.0, 2.0, 2.0, 0.0], None),
            Err(AnalysisError::InsufficientData { needed: 2, got: 1 })
        ));
        assert!(powerlaw_fit(&synthetic_series(), Some(5.0)).is_err());
    }

    /// Samples drawn from `P(x) ~ x^-2` on `1..=20` give back an exponent
    /// near -2 within sampling noise.
    #[test]
    fn sampled_power_law_is_recovered_within_tolerance() {
        let weights: Vec<f64> = (1..=20_u32).map(|x| f64::from(x).powi(-2)).collect();
        let total: f64 = weights.iter().sum();
        let mut rng = SmallRng::seed_from_u64(2024);

        let series: Vec<f64> = (0..200_000)
            .map(|_| {
                let mut u = rng.random_range(0.0..total);
                let mut value = weights.len();
                for (i, w) in weights.iter().enumerate() {
                    if u < *w {
                        value = i + 1;
                        break;
                    }
                    u -= w;
                }
                value as f64
            })
            .collect();

        let fit = powerlaw_fit(&series, None).unwrap();
        let slope = fit.exponent().unwrap();
        assert!((slope + 2.0).abs() < 0.1, "slope {slope}");
    }
}
