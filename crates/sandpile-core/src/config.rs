//! Configuration loading and typed config structures for the sandpile
//! simulation.
//!
//! The optional configuration file is `sandpile.yaml`. Every field has a
//! default, so an empty file (or no file at all) yields a 10x10 orthogonal
//! sandpile with single-grain random drops. Command-line flags override
//! file values after loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use sandpile_types::{Cell, Dimensions, DistanceMetric, RuleKind, TimePolicy};

use crate::driver::{DropAmount, DropPolicy, DropTarget};
use crate::relax::RelaxationEngine;
use crate::threshold::ThresholdSchedule;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration. Mirrors `sandpile.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid shape and starting content.
    #[serde(default)]
    pub grid: GridConfig,

    /// Toppling rule and threshold.
    #[serde(default)]
    pub rule: RuleConfig,

    /// Relaxation loop settings.
    #[serde(default)]
    pub relaxation: RelaxationConfig,

    /// Avalanche loop settings.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Check values that parse but cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.length == 0 || self.grid.width == 0 {
            return Err(invalid("grid", "length and width must be positive"));
        }
        if !self.rule.threshold_step.is_finite() || self.rule.threshold_step < 0.0 {
            return Err(invalid(
                "rule.threshold_step",
                "must be a finite, non-negative number",
            ));
        }
        if self.logging.progress_interval == 0 {
            return Err(invalid("logging.progress_interval", "must be positive"));
        }
        if self.relaxation.max_waves == Some(0) {
            return Err(invalid("relaxation.max_waves", "must be positive when set"));
        }
        self.driver.drop.validate(self.dimensions())
    }

    /// Grid dimensions.
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.grid.length, self.grid.width)
    }

    /// Threshold schedule for the configured rule.
    pub fn schedule(&self) -> ThresholdSchedule {
        ThresholdSchedule::ramp(self.rule.threshold(), self.rule.threshold_step)
    }

    /// Relaxation engine for the configured policy.
    pub const fn engine(&self) -> RelaxationEngine {
        RelaxationEngine::new(self.relaxation.time_policy)
            .with_max_waves(self.relaxation.max_waves)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Grid shape and starting content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of rows.
    #[serde(default = "default_side")]
    pub length: usize,

    /// Number of columns.
    #[serde(default = "default_side")]
    pub width: usize,

    /// Units placed on every cell at construction.
    #[serde(default)]
    pub offset: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            length: default_side(),
            width: default_side(),
            offset: 0,
        }
    }
}

/// Toppling rule and threshold.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleConfig {
    /// Rule variant.
    #[serde(default = "default_rule_kind")]
    pub kind: RuleKind,

    /// Threshold at time zero. Defaults to the variant's own default.
    #[serde(default)]
    pub threshold: Option<u64>,

    /// Threshold increase per elapsed time step. Zero keeps it constant.
    #[serde(default)]
    pub threshold_step: f64,

    /// Extent metric override. Defaults to the variant's own metric.
    #[serde(default)]
    pub metric: Option<DistanceMetric>,
}

impl RuleConfig {
    /// Threshold at time zero.
    pub fn threshold(&self) -> u64 {
        self.threshold.unwrap_or(self.kind.default_threshold())
    }

    /// Extent metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric.unwrap_or(self.kind.default_metric())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            kind: default_rule_kind(),
            threshold: None,
            threshold_step: 0.0,
            metric: None,
        }
    }
}

/// Relaxation loop settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelaxationConfig {
    /// When time advances during an avalanche.
    #[serde(default)]
    pub time_policy: TimePolicy,

    /// Optional ceiling on waves per avalanche.
    #[serde(default)]
    pub max_waves: Option<u64>,
}

/// Avalanche loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Number of avalanches to record.
    #[serde(default = "default_avalanches")]
    pub avalanches: u64,

    /// Seed for drop sites, drop amounts, and randomized topples.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Where and how much to drop.
    #[serde(default)]
    pub drop: DropConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            avalanches: default_avalanches(),
            seed: default_seed(),
            drop: DropConfig::default(),
        }
    }
}

/// Drop site selection as it appears in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSite {
    /// Uniformly random cell.
    #[default]
    Random,
    /// The centre cell.
    Centre,
    /// Uniformly among the cells of the top-left quarter.
    TopLeftQuarter,
    /// Uniformly among an explicit list of cells.
    Cells,
}

/// Drop settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropConfig {
    /// Site selection.
    #[serde(default)]
    pub target: DropSite,

    /// Candidate cells when `target` is `cells`.
    #[serde(default)]
    pub cells: Vec<Cell>,

    /// Units per drop, or the lower bound when `amount_max` is set.
    #[serde(default = "default_amount")]
    pub amount: u64,

    /// Inclusive upper bound for a uniformly random amount.
    #[serde(default)]
    pub amount_max: Option<u64>,
}

impl DropConfig {
    fn validate(&self, dimensions: Dimensions) -> Result<(), ConfigError> {
        match self.amount_max {
            Some(max) if max < self.amount => {
                return Err(invalid("driver.drop.amount_max", "must not be below amount"));
            }
            Some(0) | None if self.amount == 0 => {
                return Err(invalid(
                    "driver.drop.amount",
                    "drops must be able to add mass",
                ));
            }
            _ => {}
        }
        if self.target == DropSite::Cells {
            if self.cells.is_empty() {
                return Err(invalid("driver.drop.cells", "target `cells` needs at least one cell"));
            }
            if let Some(cell) = self.cells.iter().find(|&&c| !dimensions.contains(c)) {
                return Err(ConfigError::Invalid {
                    field: "driver.drop.cells",
                    reason: format!("{cell} is outside the {dimensions} grid"),
                });
            }
        }
        Ok(())
    }

    /// Build the drop policy for a grid of `dimensions`.
    pub fn policy(&self, dimensions: Dimensions) -> DropPolicy {
        let target = match self.target {
            DropSite::Random => DropTarget::Random,
            DropSite::Centre => DropPolicy::centre(dimensions).target,
            DropSite::TopLeftQuarter => DropPolicy::top_left_quarter(dimensions).target,
            DropSite::Cells => DropTarget::AnyOf(self.cells.clone()),
        };
        let amount = match self.amount_max {
            Some(max) => DropAmount::Uniform {
                min: self.amount,
                max,
            },
            None => DropAmount::Fixed(self.amount),
        };
        DropPolicy { target, amount }
    }
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            target: DropSite::Random,
            cells: Vec::new(),
            amount: default_amount(),
            amount_max: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log a progress line every N avalanches.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Where to write the JSON export. No export when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_side() -> usize {
    10
}

const fn default_rule_kind() -> RuleKind {
    RuleKind::Orthogonal
}

const fn default_avalanches() -> u64 {
    1000
}

const fn default_seed() -> u64 {
    42
}

const fn default_amount() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_progress_interval() -> u64 {
    100
}
