//! # Familiar Sim
//!
//! Headless driver for Project Familiar.
//!
//! Runs a seeded scenario of an owner, its pet and a pack of hostiles for a
//! fixed number of ticks and logs what the pet did. Usage:
//!
//! ```text
//! familiar-sim [config.toml]
//! ```
//!
//! Set `FAMILIAR_LOG_FORMAT=json` for JSON log lines.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod scenario;

use anyhow::Result;
use familiar_gameplay::PetConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::SimConfig;
use crate::scenario::Scenario;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    let json = std::env::var("FAMILIAR_LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .with(EnvFilter::from_default_env().add_directive("familiar=info".parse()?))
        .init();

    info!("Project Familiar simulation starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load_from(path),
        None => SimConfig::load(),
    };
    config.validate();

    let pet_config = config
        .pet_config
        .as_ref()
        .map_or_else(PetConfig::default, PetConfig::load_from);

    let mut scenario = Scenario::new(&config, pet_config)?;
    let report = scenario.run(config.ticks);

    info!(
        "Ran {} ticks: {} transitions, {} hostiles slain, {} deaths, {} revives",
        report.ticks, report.transitions, report.hostiles_slain, report.pet_deaths, report.revives
    );
    info!("Pet finished at level {} with {} experience", report.level, report.experience);

    info!("Project Familiar simulation complete");
    Ok(())
}
