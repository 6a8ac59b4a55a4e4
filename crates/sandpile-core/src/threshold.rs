//! Threshold schedules.
//!
//! A stationary sandpile uses one threshold forever. A non-stationary one
//! raises it as time passes; the schedule makes that an explicit function
//! of elapsed time instead of a mutation buried in the time step.

use serde::{Deserialize, Serialize};

/// Threshold as a function of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ThresholdSchedule {
    /// The same threshold at every time step.
    Constant {
        /// The threshold.
        value: u64,
    },
    /// `ceil(base + per_step * t)`, never below `base`.
    Ramp {
        /// Threshold at `t = 0`.
        base: u64,
        /// Increase per elapsed time step.
        per_step: f64,
    },
}

impl ThresholdSchedule {
    /// A constant schedule.
    pub const fn constant(value: u64) -> Self {
        Self::Constant { value }
    }

    /// A ramp, or a constant schedule when `per_step` is zero.
    pub fn ramp(base: u64, per_step: f64) -> Self {
        if per_step.abs() < f64::EPSILON {
            Self::Constant { value: base }
        } else {
            Self::Ramp { base, per_step }
        }
    }

    /// The smallest threshold the schedule can produce.
    pub const fn base(&self) -> u64 {
        match *self {
            Self::Constant { value } => value,
            Self::Ramp { base, .. } => base,
        }
    }

    /// Threshold at elapsed time `time`.
    // Time and base stay far below 2^52 in any realistic run, and the float
    // is range-checked before the final cast.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn at(&self, time: u64) -> u64 {
        match *self {
            Self::Constant { value } => value,
            Self::Ramp { base, per_step } => {
                let (elapsed, floor, ceiling) = (time as f64, base as f64, u64::MAX as f64);
                let raw = elapsed.mul_add(per_step, floor).ceil();
                if raw.is_nan() || raw <= floor {
                    return base;
                }
                if raw >= ceiling {
                    return u64::MAX;
                }
                raw as u64
            }
        }
    }

    /// Whether the schedule changes over time.
    pub const fn is_stationary(&self) -> bool {
        matches!(self, Self::Constant { .. })
    }
}
