//! Enumeration types for the sandpile simulation.
//!
//! Rule variants, distance metrics, time-increment policies, and the names
//! of the per-avalanche observables.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Toppling rule variants
// ---------------------------------------------------------------------------

/// The toppling rule selected for a session.
///
/// The set is closed: a session picks one variant at construction and
/// never swaps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Overloaded at `cell >= threshold`; sends one unit to each of the four
    /// axis-aligned neighbors.
    Orthogonal,
    /// Overloaded at `cell >= threshold`; sends one unit to each of the eight
    /// surrounding neighbors.
    Radial,
    /// Overloaded when the cell exceeds any of its eight neighbors by the
    /// threshold; sends one unit down each steep enough slope.
    Differential,
    /// Never overloaded; topples are invoked externally on random cells.
    Randomized,
}

impl RuleKind {
    /// Default threshold for this variant.
    pub const fn default_threshold(self) -> u64 {
        match self {
            Self::Orthogonal => 4,
            Self::Radial | Self::Differential | Self::Randomized => 8,
        }
    }

    /// Distance metric used for the avalanche extent of this variant.
    ///
    /// Four-neighbor variants measure Manhattan distance, eight-neighbor
    /// variants measure Euclidean radius.
    pub const fn default_metric(self) -> DistanceMetric {
        match self {
            Self::Orthogonal | Self::Randomized => DistanceMetric::Manhattan,
            Self::Radial | Self::Differential => DistanceMetric::Euclidean,
        }
    }

    /// Lowercase name, as used in configuration files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orthogonal => "orthogonal",
            Self::Radial => "radial",
            Self::Differential => "differential",
            Self::Randomized => "randomized",
        }
    }
}

impl core::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Distance metric
// ---------------------------------------------------------------------------

/// Metric used to measure the extent of an avalanche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `|dr| + |dc|`. Exported under the `Distance` key.
    Manhattan,
    /// `sqrt(dr^2 + dc^2)`. Exported under the `Radius` key.
    Euclidean,
}

impl DistanceMetric {
    /// Export key for the extent series measured with this metric.
    pub const fn series_key(self) -> &'static str {
        match self {
            Self::Manhattan => "Distance",
            Self::Euclidean => "Radius",
        }
    }
}

// ---------------------------------------------------------------------------
// Time policy
// ---------------------------------------------------------------------------

/// When the relaxation engine advances the clock during an avalanche.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePolicy {
    /// One time step per wave. Duration counts waves.
    #[default]
    PerWave,
    /// One time step per individual topple. Duration counts topples.
    PerTopple,
}

// ---------------------------------------------------------------------------
// Observables
// ---------------------------------------------------------------------------

/// One of the five per-avalanche observables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observable {
    /// Elapsed time steps from avalanche start to stability.
    Duration,
    /// Number of individual topple applications.
    Topples,
    /// Number of distinct cells that toppled.
    Area,
    /// Mass dissipated off the grid.
    LostMass,
    /// Maximum distance from the first toppled cell.
    Extent,
}

impl Observable {
    /// All observables, in export order.
    pub const ALL: [Self; 5] = [
        Self::Duration,
        Self::Topples,
        Self::Area,
        Self::LostMass,
        Self::Extent,
    ];

    /// Export key for this observable. The extent key depends on the metric.
    pub const fn key(self, metric: DistanceMetric) -> &'static str {
        match self {
            Self::Duration => "Duration",
            Self::Topples => "Topples",
            Self::Area => "Area",
            Self::LostMass => "Lost mass",
            Self::Extent => metric.series_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_share_counts() {
        assert_eq!(RuleKind::Orthogonal.default_threshold(), 4);
        assert_eq!(RuleKind::Radial.default_threshold(), 8);
    }

    #[test]
    fn extent_key_follows_metric() {
        assert_eq!(Observable::Extent.key(DistanceMetric::Manhattan), "Distance");
        assert_eq!(Observable::Extent.key(DistanceMetric::Euclidean), "Radius");
        assert_eq!(Observable::LostMass.key(DistanceMetric::Euclidean), "Lost mass");
    }

    #[test]
    fn rule_kind_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&RuleKind::Differential).ok();
        assert_eq!(json.as_deref(), Some("\"differential\""));
        let parsed: Result<RuleKind, _> = serde_json::from_str("\"radial\"");
        assert_eq!(parsed.ok(), Some(RuleKind::Radial));
    }

    #[test]
    fn time_policy_defaults_to_per_wave() {
        assert_eq!(TimePolicy::default(), TimePolicy::PerWave);
    }
}
