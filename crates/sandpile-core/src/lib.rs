//! Avalanche engine and session orchestration for the sandpile simulation.
//!
//! This crate drives a grid from perturbation to stability and records what
//! each avalanche looked like.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `sandpile.yaml` into
//!   strongly-typed structs.
//! - [`threshold`] -- [`ThresholdSchedule`]: constant or ramping threshold
//!   as a function of elapsed time.
//! - [`rule`] -- [`ToppleRule`]: the overload predicate and topple
//!   redistribution for each rule variant.
//! - [`relax`] -- [`RelaxationEngine`]: the wave loop that runs one
//!   avalanche to completion and builds its record.
//! - [`recorder`] -- [`StatisticsRecorder`]: append-only log of avalanche
//!   records and their observable series.
//! - [`session`] -- [`Session`]: the explicit owner of one grid and
//!   everything attached to it.
//! - [`driver`] -- [`Driver`] and [`DropPolicy`]: the drop-until-avalanche
//!   loop and progress callbacks.
//! - [`export`] -- JSON snapshot of a session.
//!
//! [`ThresholdSchedule`]: threshold::ThresholdSchedule
//! [`ToppleRule`]: rule::ToppleRule
//! [`RelaxationEngine`]: relax::RelaxationEngine
//! [`StatisticsRecorder`]: recorder::StatisticsRecorder
//! [`Session`]: session::Session
//! [`Driver`]: driver::Driver
//! [`DropPolicy`]: driver::DropPolicy

pub mod config;
pub mod driver;
pub mod export;
pub mod recorder;
pub mod relax;
pub mod rule;
pub mod session;
pub mod threshold;
