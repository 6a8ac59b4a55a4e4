//! Command-line entry point for the sandpile simulation.
//!
//! `sandpile run` drives a grid with the configured drop policy until the
//! requested number of avalanches has been recorded, logs progress, prints
//! a JSON summary, and optionally writes a session export.
//! `sandpile analyze` reads such an export and prints a histogram,
//! power-law fit, and optional regression of one observable.
//!
//! Logs go to stderr so that stdout carries only the JSON report.

mod analyze;
mod cli;
mod error;
mod run;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the simulation, or analysis fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            let config = run::load_config(&args)?;
            init_logging(&config.logging.level, cli.log_json);
            info!("sandpile run starting");
            let report = run::execute(&config)?;
            print_json(&report)?;
        }
        Command::Analyze(args) => {
            init_logging("info", cli.log_json);
            let report = analyze::execute(&args)?;
            print_json(&report)?;
        }
    }
    Ok(())
}

/// Initialize structured logging. `RUST_LOG` wins over `default_level`.
fn init_logging(default_level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(report: &impl serde::Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
