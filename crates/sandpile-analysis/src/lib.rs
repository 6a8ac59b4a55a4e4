//! Numeric analysis of avalanche observable series.
//!
//! Self-organized criticality shows up as power-law distributed avalanche
//! sizes: the number of avalanches of size `s` falls off like `c * s^b`.
//! This crate turns a series of observable values into the evidence for
//! that: frequency tables, histograms, and least-squares fits on linear or
//! log-log axes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for analysis operations.
//! - [`histogram`] -- Unique-value frequencies and fixed-bin histograms.
//! - [`regression`] -- Ordinary least squares with Pearson `r`, on linear
//!   or log-log axes.
//! - [`powerlaw`] -- Power-law fit of a series' frequency distribution,
//!   optionally split at a cut point.

pub mod error;
pub mod histogram;
pub mod powerlaw;
pub mod regression;

// Re-export primary types at crate root.
pub use error::AnalysisError;
pub use histogram::{DEFAULT_BINS, Histogram, frequencies, histogram};
pub use powerlaw::{PowerLawFit, powerlaw_fit};
pub use regression::{Regression, RegressionKind, linear_regression, regression};
