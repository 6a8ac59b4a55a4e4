//! Shared type definitions for the sandpile avalanche simulation.
//!
//! This crate is the single source of truth for the value types used across
//! the workspace: grid coordinates, avalanche records, rule variants, and
//! observable names.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for session identifiers
//! - [`enums`] -- Rule kinds, distance metrics, time policy, observables
//! - [`structs`] -- Cells, dimensions, and the immutable avalanche record

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{DistanceMetric, Observable, RuleKind, TimePolicy};
pub use ids::SessionId;
pub use structs::{AvalancheRecord, Cell, Dimensions};
