//! Ordinary least squares on linear or log-log axes.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Axes a regression runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    /// Fit `y = slope * x + intercept`.
    #[default]
    Linear,
    /// Fit `log10 y = slope * log10 x + intercept`, i.e. `y = c * x^slope`.
    PowerLaw,
}

/// Result of a least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    /// Fitted slope. For a power law this is the exponent.
    pub slope: f64,
    /// Fitted intercept. For a power law this is `log10` of the prefactor.
    pub intercept: f64,
    /// Pearson correlation coefficient of the fitted points.
    pub r_value: f64,
    /// Number of points the fit used.
    pub points: usize,
}

impl Regression {
    /// `10^intercept`, the prefactor `c` of a power law `c * x^slope`.
    pub fn prefactor(&self) -> f64 {
        10_f64.powf(self.intercept)
    }

    /// Evaluate the fitted line at `x` on the axes it was fitted on.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Least-squares line through `(x, y)` with its Pearson `r`.
///
/// `r` is zero when every `y` is the same.
///
/// # Errors
///
/// - [`AnalysisError::LengthMismatch`] if the slices differ in length
/// - [`AnalysisError::InsufficientData`] for fewer than two points
/// - [`AnalysisError::NonFinite`] for NaN or infinite input
/// - [`AnalysisError::ZeroVariance`] if every `x` is the same
#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<Regression, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            needed: 2,
            got: x.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFinite);
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx = dx.mul_add(dx, sxx);
        syy = dy.mul_add(dy, syy);
        sxy = dx.mul_add(dy, sxy);
    }
    if sxx <= 0.0 {
        return Err(AnalysisError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-mean_x, mean_y);
    let r_value = if syy > 0.0 {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    Ok(Regression {
        slope,
        intercept,
        r_value,
        points: x.len(),
    })
}

/// Fit `y` against `x` on the axes `kind` selects.
///
/// With `remove_zeros`, pairs whose `x` is zero are dropped first. A power
/// law fit then takes `log10` of both coordinates, so any remaining value
/// that is not strictly positive is an error.
///
/// # Errors
///
/// Returns [`AnalysisError::NonPositive`] for a power law over a
/// non-positive value, and everything [`linear_regression`] returns.
pub fn regression(
    x: &[f64],
    y: &[f64],
    kind: RegressionKind,
    remove_zeros: bool,
) -> Result<Regression, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(xi, _)| !remove_zeros || xi.abs() > 0.0)
        .map(|(xi, yi)| (*xi, *yi))
        .unzip();

    match kind {
        RegressionKind::Linear => linear_regression(&xs, &ys),
        RegressionKind::PowerLaw => {
            let lx = log10_all(&xs)?;
            let ly = log10_all(&ys)?;
            linear_regression(&lx, &ly)
        }
    }
}

pub(crate) fn log10_all(values: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    values
        .iter()
        .map(|&v| {
            if v > 0.0 {
                Ok(v.log10())
            } else {
                Err(AnalysisError::NonPositive { value: v })
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exact_line_is_recovered() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.5f64.mul_add(*v, -1.0)).collect();
        let fit = linear_regression(&x, &y).unwrap();
        assert!(close(fit.slope, 2.5));
        assert!(close(fit.intercept, -1.0));
        assert!(close(fit.r_value, 1.0));
        assert_eq!(fit.points, 5);
        assert!(close(fit.predict(10.0), 24.0));
    }

    #[test]
    fn anticorrelated_points_have_negative_r() {
        let fit = linear_regression(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.5, 1.0, 0.5]).unwrap();
        assert!(fit.slope < 0.0);
        assert!(fit.r_value < -0.9);
    }

    #[test]
    fn flat_y_has_zero_r() {
        let fit = linear_regression(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).unwrap();
        assert!(close(fit.slope, 0.0));
        assert!(close(fit.r_value, 0.0));
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert_eq!(
            linear_regression(&[1.0], &[1.0]),
            Err(AnalysisError::InsufficientData { needed: 2, got: 1 })
        );
        assert_eq!(
            linear_regression(&[1.0, 1.0], &[1.0, 2.0]),
            Err(AnalysisError::ZeroVariance)
        );
        assert_eq!(
            linear_regression(&[1.0, 2.0], &[1.0]),
            Err(AnalysisError::LengthMismatch { x: 2, y: 1 })
        );
    }

    #[test]
    fn power_law_recovers_exponent_and_prefactor() {
        let x: Vec<f64> = (1..=20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v.powf(-1.2)).collect();
        let fit = regression(&x, &y, RegressionKind::PowerLaw, false).unwrap();
        assert!(close(fit.slope, -1.2));
        assert!(close(fit.prefactor(), 3.0));
    }

    #[test]
    fn remove_zeros_drops_pairs_at_x_zero() {
        let x = [0.0, 1.0, 10.0, 100.0];
        let y = [7.0, 1.0, 100.0, 10_000.0];
        assert_eq!(
            regression(&x, &y, RegressionKind::PowerLaw, false),
            Err(AnalysisError::NonPositive { value: 0.0 })
        );
        let fit = regression(&x, &y, RegressionKind::PowerLaw, true).unwrap();
        assert_eq!(fit.points, 3);
        assert!(close(fit.slope, 2.0));
    }

    #[test]
    fn power_law_rejects_non_positive_y() {
        assert!(matches!(
            regression(&[1.0, 2.0], &[1.0, -1.0], RegressionKind::PowerLaw, true),
            Err(AnalysisError::NonPositive { .. })
        ));
    }
}
