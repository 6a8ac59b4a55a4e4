//! Toppling rules.
//!
//! A rule answers two questions about a grid: which cells are overloaded at
//! a given threshold, and what one topple of a given cell does. Topples are
//! pure: they return a [`Redistribution`] and never touch the grid. The
//! relaxation engine hands that description to [`Grid::apply`].
//!
//! The variant set is closed and chosen once per session:
//!
//! | Variant | Overloaded when | Topple | Extent metric |
//! |---|---|---|---|
//! | Orthogonal | `cell >= threshold` | 1 unit to each of 4 neighbors | Manhattan |
//! | Radial | `cell >= threshold` | 1 unit to each of 8 neighbors | Euclidean |
//! | Differential | any of 8 neighbors `threshold` lower | 1 unit down each steep slope | Euclidean |
//! | Randomized | never | 1 unit to each of 4 neighbors, capped by content | Manhattan |
//!
//! Off-grid neighbors absorb whatever is sent to them. A randomized topple
//! that cannot feed every neighbor picks which ones at random.
//!
//! [`Grid::apply`]: sandpile_grid::Grid::apply

mod differential;
mod orthogonal;
mod radial;
mod randomized;

use rand::Rng;
use sandpile_grid::{Grid, GridError, Neighborhood, Redistribution, Slot};
use sandpile_types::{Cell, Dimensions, DistanceMetric, RuleKind};

use crate::threshold::ThresholdSchedule;

/// Errors raised when building or applying a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The threshold is too small for the rule's share count.
    #[error("threshold {threshold} is invalid for the {kind} rule (minimum {minimum})")]
    InvalidThreshold {
        /// The rule variant.
        kind: RuleKind,
        /// The offending threshold.
        threshold: u64,
        /// Smallest valid threshold.
        minimum: u64,
    },

    /// The grid is too thin for the rule's neighborhood.
    #[error("the {kind} rule needs at least 2x2 cells, grid is {dimensions}")]
    DegenerateGrid {
        /// The rule variant.
        kind: RuleKind,
        /// The grid's dimensions.
        dimensions: Dimensions,
    },

    /// A topple referenced a cell outside the grid.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// A topple's unit count overflowed.
    #[error("arithmetic overflow while building a topple")]
    ArithmeticOverflow,
}

/// The toppling rule of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToppleRule {
    kind: RuleKind,
    metric: DistanceMetric,
}

impl ToppleRule {
    /// Build a rule for a grid of `dimensions` under `schedule`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidThreshold`] when the schedule's base is
    /// below [`Self::minimum_threshold`], and [`RuleError::DegenerateGrid`]
    /// when an eight-neighbor rule runs on a grid one cell thick.
    pub fn new(
        kind: RuleKind,
        schedule: &ThresholdSchedule,
        dimensions: Dimensions,
    ) -> Result<Self, RuleError> {
        let minimum = Self::minimum_threshold(kind);
        let threshold = schedule.base();
        if threshold < minimum {
            return Err(RuleError::InvalidThreshold {
                kind,
                threshold,
                minimum,
            });
        }
        if Self::neighborhood_of(kind) == Neighborhood::Moore
            && (dimensions.length < 2 || dimensions.width < 2)
        {
            return Err(RuleError::DegenerateGrid { kind, dimensions });
        }
        Ok(Self {
            kind,
            metric: kind.default_metric(),
        })
    }

    /// Override the extent metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// The rule variant.
    pub const fn kind(&self) -> RuleKind {
        self.kind
    }

    /// The metric used for avalanche extent.
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// The neighborhood the rule distributes to.
    pub const fn neighborhood(&self) -> Neighborhood {
        Self::neighborhood_of(self.kind)
    }

    /// Smallest threshold for which a topple can never drive a cell
    /// negative.
    pub const fn minimum_threshold(kind: RuleKind) -> u64 {
        match kind {
            RuleKind::Orthogonal => 4,
            RuleKind::Radial => 8,
            RuleKind::Differential | RuleKind::Randomized => 1,
        }
    }

    const fn neighborhood_of(kind: RuleKind) -> Neighborhood {
        match kind {
            RuleKind::Orthogonal | RuleKind::Randomized => Neighborhood::VonNeumann,
            RuleKind::Radial | RuleKind::Differential => Neighborhood::Moore,
        }
    }

    /// Cells that would topple at `threshold`, in row-major order.
    pub fn overloaded(&self, grid: &Grid, threshold: u64) -> Vec<Cell> {
        match self.kind {
            RuleKind::Orthogonal => orthogonal::overloaded(grid, threshold),
            RuleKind::Radial => radial::overloaded(grid, threshold),
            RuleKind::Differential => differential::overloaded(grid, threshold),
            RuleKind::Randomized => randomized::overloaded(grid, threshold),
        }
    }

    /// Describe one topple of `cell` at `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Grid`] if `cell` is outside the grid.
    pub fn topple(
        &self,
        grid: &Grid,
        cell: Cell,
        threshold: u64,
    ) -> Result<Redistribution, RuleError> {
        match self.kind {
            RuleKind::Orthogonal => orthogonal::topple(grid, cell),
            RuleKind::Radial => radial::topple(grid, cell),
            RuleKind::Differential => differential::topple(grid, cell, threshold),
            RuleKind::Randomized => randomized::topple(grid, cell),
        }
    }

    /// Like [`Self::topple`], but a randomized topple that cannot feed every
    /// neighbor picks which ones to feed with `rng`. Other variants ignore
    /// `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Grid`] if `cell` is outside the grid.
    pub fn topple_shuffled<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        cell: Cell,
        threshold: u64,
        rng: &mut R,
    ) -> Result<Redistribution, RuleError> {
        match self.kind {
            RuleKind::Randomized => randomized::topple_shuffled(grid, cell, rng),
            _ => self.topple(grid, cell, threshold),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Cells whose value is at least `threshold`, row-major.
fn at_or_above(grid: &Grid, threshold: u64) -> Vec<Cell> {
    grid.iter()
        .filter(|&(_, value)| value >= threshold)
        .map(|(cell, _)| cell)
        .collect()
}

/// Send one unit to every slot of `neighborhood`. Off-grid shares dissipate.
fn scatter(
    grid: &Grid,
    cell: Cell,
    neighborhood: Neighborhood,
) -> Result<Redistribution, RuleError> {
    grid.get(cell)?;
    grid.neighbors(cell, neighborhood)
        .into_iter()
        .try_fold(Redistribution::empty(cell), |acc, slot| acc.send(slot, 1))
        .ok_or(RuleError::ArithmeticOverflow)
}

/// Send one unit to each of `slots` in order, stopping when the cell is
/// empty.
fn scatter_capped(
    grid: &Grid,
    cell: Cell,
    slots: impl IntoIterator<Item = Slot>,
) -> Result<Redistribution, RuleError> {
    let held = grid.get(cell)?;
    slots
        .into_iter()
        .take(usize::try_from(held).unwrap_or(usize::MAX))
        .try_fold(Redistribution::empty(cell), |acc, slot| acc.send(slot, 1))
        .ok_or(RuleError::ArithmeticOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        Dimensions::new(5, 5)
    }

    #[test]
    fn thresholds_below_share_count_are_rejected() {
        let low = ThresholdSchedule::constant(3);
        assert!(matches!(
            ToppleRule::new(RuleKind::Orthogonal, &low, dims()),
            Err(RuleError::InvalidThreshold { minimum: 4, .. })
        ));
        let low = ThresholdSchedule::constant(7);
        assert!(matches!(
            ToppleRule::new(RuleKind::Radial, &low, dims()),
            Err(RuleError::InvalidThreshold { minimum: 8, .. })
        ));
        let zero = ThresholdSchedule::constant(0);
        assert!(ToppleRule::new(RuleKind::Differential, &zero, dims()).is_err());
    }

    #[test]
    fn moore_rules_reject_thin_grids() {
        let schedule = ThresholdSchedule::constant(8);
        let thin = Dimensions::new(1, 10);
        assert!(matches!(
            ToppleRule::new(RuleKind::Radial, &schedule, thin),
            Err(RuleError::DegenerateGrid { .. })
        ));
        assert!(matches!(
            ToppleRule::new(RuleKind::Differential, &schedule, thin),
            Err(RuleError::DegenerateGrid { .. })
        ));
        assert!(ToppleRule::new(RuleKind::Orthogonal, &schedule, thin).is_ok());
    }

    #[test]
    fn metric_follows_variant_unless_overridden() {
        let schedule = ThresholdSchedule::constant(8);
        let radial = ToppleRule::new(RuleKind::Radial, &schedule, dims()).unwrap();
        assert_eq!(radial.metric(), DistanceMetric::Euclidean);
        let orthogonal = ToppleRule::new(RuleKind::Orthogonal, &schedule, dims()).unwrap();
        assert_eq!(orthogonal.metric(), DistanceMetric::Manhattan);
        assert_eq!(
            orthogonal.with_metric(DistanceMetric::Euclidean).metric(),
            DistanceMetric::Euclidean
        );
    }

    #[test]
    fn shuffled_topple_only_reorders_the_randomized_rule() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let grid = Grid::from_rows(&[vec![0, 0, 0], vec![0, 5, 0], vec![0, 0, 0]]).unwrap();
        let schedule = ThresholdSchedule::constant(4);
        let mut rng = StdRng::seed_from_u64(9);
        let dims = grid.dimensions();
        let orthogonal = ToppleRule::new(RuleKind::Orthogonal, &schedule, dims).unwrap();
        assert_eq!(
            orthogonal.topple_shuffled(&grid, Cell::new(1, 1), 4, &mut rng).unwrap(),
            orthogonal.topple(&grid, Cell::new(1, 1), 4).unwrap()
        );
        let randomized = ToppleRule::new(RuleKind::Randomized, &schedule, dims).unwrap();
        let shuffled = randomized.topple_shuffled(&grid, Cell::new(1, 1), 4, &mut rng).unwrap();
        // Five units cover all four neighbors whatever the order.
        assert_eq!(shuffled.removed, 4);
        assert_eq!(shuffled.credits.len(), 4);
    }

    #[test]
    fn topple_outside_grid_is_an_error() {
        let grid = Grid::new(3, 3).unwrap();
        let schedule = ThresholdSchedule::constant(4);
        let rule = ToppleRule::new(RuleKind::Orthogonal, &schedule, grid.dimensions()).unwrap();
        assert!(matches!(
            rule.topple(&grid, Cell::new(3, 3), 4),
            Err(RuleError::Grid { .. })
        ));
    }
}
