//! Conservation law verification for the mass ledger.
//!
//! Topples are internal movements: the units taken from a toppled cell are
//! either credited to neighbors or dissipated off the grid. Drops are the
//! only source and dissipation the only sink, so the grid's mass is fully
//! determined by the ledger totals.
//!
//! Each well-formed topple is balanced by construction (the ledger rejects
//! unbalanced ones), so the per-avalanche balance check passes for valid
//! flows. The mass check compares against what the grid actually reports
//! and catches a redistribution that bypassed the ledger.

use crate::MassAnomaly;
use crate::ledger::AvalancheFlows;

/// The result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Mass is accounted for.
    Balanced,
    /// Mass appeared or vanished without a recorded flow.
    Anomaly(MassAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Verify one closed avalanche.
///
/// Checks that the summed topples balance (`removed == delivered +
/// dissipated`) and that the grid lost exactly the dissipated units
/// (`mass_before - mass_after == dissipated`).
pub fn verify_avalanche(flows: &AvalancheFlows) -> ConservationResult {
    let index = flows.index;

    match flows.delivered.checked_add(flows.dissipated) {
        Some(moved) if moved == flows.removed => {}
        Some(moved) => {
            return ConservationResult::Anomaly(MassAnomaly {
                avalanche: Some(index),
                expected: flows.removed,
                actual: moved,
                message: format!(
                    "MASS_ANOMALY in avalanche {index}: removed {} but moved {moved}",
                    flows.removed
                ),
            });
        }
        None => return overflow_anomaly(Some(index)),
    }

    let Some(expected_after) = flows.mass_before.checked_sub(flows.dissipated) else {
        return ConservationResult::Anomaly(MassAnomaly {
            avalanche: Some(index),
            expected: flows.mass_before,
            actual: flows.dissipated,
            message: format!(
                "MASS_ANOMALY in avalanche {index}: dissipated {} exceeds starting mass {}",
                flows.dissipated, flows.mass_before
            ),
        });
    };

    if expected_after == flows.mass_after {
        ConservationResult::Balanced
    } else {
        ConservationResult::Anomaly(MassAnomaly {
            avalanche: Some(index),
            expected: expected_after,
            actual: flows.mass_after,
            message: format!(
                "MASS_ANOMALY in avalanche {index}: expected mass {expected_after}, grid holds {}",
                flows.mass_after
            ),
        })
    }
}

/// Verify the session-wide law: `initial + dropped - dissipated == current`.
pub fn verify_session(
    initial_mass: u64,
    dropped: u64,
    dissipated: u64,
    current_mass: u64,
) -> ConservationResult {
    let expected = initial_mass
        .checked_add(dropped)
        .and_then(|total| total.checked_sub(dissipated));

    match expected {
        Some(expected) if expected == current_mass => ConservationResult::Balanced,
        Some(expected) => ConservationResult::Anomaly(MassAnomaly {
            avalanche: None,
            expected,
            actual: current_mass,
            message: format!(
                "MASS_ANOMALY in session: expected mass {expected}, grid holds {current_mass}"
            ),
        }),
        None => overflow_anomaly(None),
    }
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(avalanche: Option<u64>) -> ConservationResult {
    ConservationResult::Anomaly(MassAnomaly {
        avalanche,
        expected: 0,
        actual: 0,
        message: "MASS_ANOMALY: arithmetic overflow while summing flows".to_owned(),
    })
}
