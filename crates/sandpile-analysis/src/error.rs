//! Error types for the `sandpile-analysis` crate.

/// Errors that can occur during analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// Too few points for the requested operation.
    #[error("need at least {needed} data points, got {got}")]
    InsufficientData {
        /// Minimum number of points.
        needed: usize,
        /// Points supplied.
        got: usize,
    },

    /// Paired inputs have different lengths.
    #[error("x has {x} values but y has {y}")]
    LengthMismatch {
        /// Length of `x`.
        x: usize,
        /// Length of `y`.
        y: usize,
    },

    /// Every `x` value is the same, so no slope exists.
    #[error("x has zero variance")]
    ZeroVariance,

    /// A log transform met a value that is zero or negative.
    #[error("cannot take the logarithm of non-positive value {value}")]
    NonPositive {
        /// The offending value.
        value: f64,
    },

    /// The input contains NaN or an infinity.
    #[error("input contains a non-finite value")]
    NonFinite,

    /// A histogram was requested with zero bins.
    #[error("histogram needs at least one bin")]
    NoBins,
}
