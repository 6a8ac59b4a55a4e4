//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sandpile_analysis::{DEFAULT_BINS, RegressionKind};
use sandpile_core::config::{DropSite, SimulationConfig};
use sandpile_types::{Observable, RuleKind, TimePolicy};

/// Abelian sandpile avalanche simulator.
#[derive(Parser, Debug)]
#[command(name = "sandpile")]
#[command(about = "Drive a sandpile to criticality and analyze its avalanches")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record avalanches and optionally export the session.
    Run(RunArgs),
    /// Analyze one observable from a session export.
    Analyze(AnalyzeArgs),
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Arguments of `sandpile run`. Every flag overrides the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (YAML).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of rows.
    #[arg(long)]
    pub length: Option<usize>,

    /// Number of columns.
    #[arg(long)]
    pub width: Option<usize>,

    /// Number of avalanches to record.
    #[arg(long, short = 'n')]
    pub avalanches: Option<u64>,

    /// Toppling rule.
    #[arg(long, value_enum)]
    pub rule: Option<RuleArg>,

    /// Topple threshold at time zero.
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Threshold increase per time step.
    #[arg(long)]
    pub threshold_step: Option<f64>,

    /// Advance time once per topple instead of once per wave.
    #[arg(long)]
    pub per_topple: bool,

    /// Where drops land.
    #[arg(long, value_enum)]
    pub drop: Option<DropArg>,

    /// Units per drop.
    #[arg(long)]
    pub amount: Option<u64>,

    /// Draw each drop's amount uniformly up to this value.
    #[arg(long)]
    pub amount_max: Option<u64>,

    /// Random seed for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the session export (JSON) here.
    #[arg(long, short = 'o')]
    pub export: Option<PathBuf>,
}

impl RunArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(length) = self.length {
            config.grid.length = length;
        }
        if let Some(width) = self.width {
            config.grid.width = width;
        }
        if let Some(avalanches) = self.avalanches {
            config.driver.avalanches = avalanches;
        }
        if let Some(rule) = self.rule {
            config.rule.kind = rule.into();
        }
        if self.threshold.is_some() {
            config.rule.threshold = self.threshold;
        }
        if let Some(step) = self.threshold_step {
            config.rule.threshold_step = step;
        }
        if self.per_topple {
            config.relaxation.time_policy = TimePolicy::PerTopple;
        }
        if let Some(drop) = self.drop {
            config.driver.drop.target = drop.into();
        }
        if let Some(amount) = self.amount {
            config.driver.drop.amount = amount;
        }
        if self.amount_max.is_some() {
            config.driver.drop.amount_max = self.amount_max;
        }
        if let Some(seed) = self.seed {
            config.driver.seed = seed;
        }
        if self.export.is_some() {
            config.export.path.clone_from(&self.export);
        }
    }
}

/// Rule names accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleArg {
    /// Four neighbors, threshold 4.
    Orthogonal,
    /// Eight neighbors, threshold 8.
    Radial,
    /// Slope-driven, eight neighbors.
    Differential,
    /// Random externally invoked topples.
    Randomized,
}

impl From<RuleArg> for RuleKind {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Orthogonal => Self::Orthogonal,
            RuleArg::Radial => Self::Radial,
            RuleArg::Differential => Self::Differential,
            RuleArg::Randomized => Self::Randomized,
        }
    }
}

/// Drop sites accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropArg {
    /// Uniformly random cell.
    Random,
    /// The centre cell.
    Centre,
    /// Cells above and left of the centre.
    TopLeftQuarter,
}

impl From<DropArg> for DropSite {
    fn from(arg: DropArg) -> Self {
        match arg {
            DropArg::Random => Self::Random,
            DropArg::Centre => Self::Centre,
            DropArg::TopLeftQuarter => Self::TopLeftQuarter,
        }
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

/// Arguments of `sandpile analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Session export written by `sandpile run`.
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Observable to analyze.
    #[arg(long, value_enum, default_value = "topples")]
    pub observable: ObservableArg,

    /// Split the power-law fit at this log10 value.
    #[arg(long)]
    pub cut: Option<f64>,

    /// Histogram bin count.
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Normalise the histogram to a density.
    #[arg(long)]
    pub density: bool,

    /// Also regress the observable against this one.
    #[arg(long, value_enum)]
    pub against: Option<ObservableArg>,

    /// Axes for the `--against` regression.
    #[arg(long, value_enum, default_value = "power-law")]
    pub axes: AxesArg,

    /// Keep pairs whose x value is zero in the `--against` regression.
    #[arg(long)]
    pub keep_zeros: bool,
}

/// Observable names accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservableArg {
    /// Time steps from first topple to stability.
    Duration,
    /// Individual topples.
    Topples,
    /// Distinct toppled cells.
    Area,
    /// Mass lost off the edge.
    LostMass,
    /// Farthest toppled cell from the origin.
    Extent,
}

impl From<ObservableArg> for Observable {
    fn from(arg: ObservableArg) -> Self {
        match arg {
            ObservableArg::Duration => Self::Duration,
            ObservableArg::Topples => Self::Topples,
            ObservableArg::Area => Self::Area,
            ObservableArg::LostMass => Self::LostMass,
            ObservableArg::Extent => Self::Extent,
        }
    }
}

/// Regression axes accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxesArg {
    /// Plain `y` against `x`.
    Linear,
    /// `log10 y` against `log10 x`.
    PowerLaw,
}

impl From<AxesArg> for RegressionKind {
    fn from(arg: AxesArg) -> Self {
        match arg {
            AxesArg::Linear => Self::Linear,
            AxesArg::PowerLaw => Self::PowerLaw,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_override_config() {
        let cli = Cli::try_parse_from([
            "sandpile",
            "run",
            "--length",
            "5",
            "--width",
            "7",
            "-n",
            "12",
            "--rule",
            "radial",
            "--per-topple",
            "--drop",
            "top-left-quarter",
            "--seed",
            "3",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected the run subcommand");
        };

        let mut config = SimulationConfig::default();
        args.apply(&mut config);
        assert_eq!(config.dimensions(), sandpile_types::Dimensions::new(5, 7));
        assert_eq!(config.driver.avalanches, 12);
        assert_eq!(config.rule.kind, RuleKind::Radial);
        assert_eq!(config.rule.threshold(), 8);
        assert_eq!(config.relaxation.time_policy, TimePolicy::PerTopple);
        assert_eq!(config.driver.drop.target, DropSite::TopLeftQuarter);
        assert_eq!(config.driver.seed, 3);
        assert!(config.export.path.is_none());
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let mut config = SimulationConfig::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn analyze_defaults() {
        let cli = Cli::try_parse_from(["sandpile", "analyze", "-i", "out.json"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected the analyze subcommand");
        };
        assert_eq!(args.observable, ObservableArg::Topples);
        assert_eq!(args.bins, 25);
        assert_eq!(args.axes, AxesArg::PowerLaw);
        assert!(args.against.is_none());
        assert!(!args.keep_zeros);
    }
}
