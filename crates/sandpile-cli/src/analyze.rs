//! `sandpile analyze`: histogram and power-law fit of one observable.

use serde::Serialize;
use tracing::{info, warn};

use sandpile_analysis::{
    Histogram, PowerLawFit, Regression, RegressionKind, histogram, powerlaw_fit, regression,
};
use sandpile_core::export::SessionExport;
use sandpile_types::Observable;

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

/// Report printed on stdout.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Export key of the analyzed observable.
    pub observable: &'static str,
    /// Number of avalanches in the series.
    pub samples: usize,
    /// Histogram of the series.
    pub histogram: Histogram,
    /// Power-law fit of the frequency distribution. Absent when the series
    /// has too few distinct positive values.
    pub fit: Option<PowerLawFit>,
    /// Regression against a second observable, when requested.
    pub regression: Option<PairRegression>,
}

/// Regression of one observable against another.
#[derive(Debug, Serialize)]
pub struct PairRegression {
    /// Export key of the x series.
    pub x: &'static str,
    /// Export key of the y series.
    pub y: &'static str,
    /// Axes the fit ran on.
    pub kind: RegressionKind,
    /// The fit.
    pub fit: Regression,
}

/// Read the export named in `args` and analyze it.
pub fn execute(args: &AnalyzeArgs) -> Result<AnalysisReport, CliError> {
    let export = SessionExport::read(&args.input)?;
    info!(
        path = %args.input.display(),
        session_id = %export.session,
        avalanches = export.avalanches.len(),
        "Export loaded"
    );
    analyze(&export, args)
}

/// Analyze an export already in memory.
pub fn analyze(export: &SessionExport, args: &AnalyzeArgs) -> Result<AnalysisReport, CliError> {
    let observable = Observable::from(args.observable);
    let (key, series) = series_of(export, observable)?;

    let histogram = histogram(series, args.bins, args.density)?;
    let fit = match powerlaw_fit(series, args.cut) {
        Ok(fit) => Some(fit),
        Err(err) => {
            warn!(observable = key, error = %err, "Power-law fit skipped");
            None
        }
    };

    let regression = args
        .against
        .map(|against| -> Result<PairRegression, CliError> {
            let (x_key, x) = series_of(export, Observable::from(against))?;
            let kind = RegressionKind::from(args.axes);
            let fit = regression(x, series, kind, !args.keep_zeros)?;
            Ok(PairRegression {
                x: x_key,
                y: key,
                kind,
                fit,
            })
        })
        .transpose()?;

    Ok(AnalysisReport {
        observable: key,
        samples: series.len(),
        histogram,
        fit,
        regression,
    })
}

fn series_of(
    export: &SessionExport,
    observable: Observable,
) -> Result<(&'static str, &[f64]), CliError> {
    let key = observable.key(export.metric);
    export
        .series(observable)
        .map(|series| (key, series))
        .ok_or(CliError::MissingSeries { key })
}
