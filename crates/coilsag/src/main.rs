#![forbid(unsafe_code)]

//! # coilsag
//!
//! Command-line front end for the `leverage` crate: static sag, the
//! travel-to-stroke transform, a headless run of the shock simulation, and
//! leverage curves measured from bike datasheets.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p coilsag -- --preset p --rider-weight 185 sag --detail
//! ```

mod cli;
mod commands;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, SagArgs};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.log_filter());

    let config = cli.resolve_config()?;
    info!(
        resolution = config.resolution(),
        travel = config.travel,
        stroke = config.stroke,
        "resolved curve configuration"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.dump_config {
        let text = toml::to_string(&config).context("failed to serialize config")?;
        write!(out, "{text}")?;
        return Ok(());
    }

    match &cli.command {
        None => commands::sag(&config, &SagArgs::default(), &mut out)?,
        Some(Command::Sag(args)) => commands::sag(&config, args, &mut out)?,
        Some(Command::Curve(args)) => commands::curve(&config, args, &mut out)?,
        Some(Command::Simulate(args)) => commands::simulate(&config, args, &mut out)?,
        Some(Command::Linkage(args)) => commands::linkage(&config, args, &mut out)?,
    }

    out.flush()?;
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
