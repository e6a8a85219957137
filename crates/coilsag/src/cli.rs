//! Command-line interface for `coilsag`.
//!
//! Defines the CLI contract using clap derive macros. Curve settings come
//! from an optional config file, then any flags given on the command line.
//!
//! # Examples
//!
//! ```bash
//! # Sag for the default flat curve
//! coilsag
//!
//! # Progressive curve, 185 lbf rider on a 450 lbf/in spring
//! coilsag --preset p --rider-weight 185 --spring-weight 450 sag --detail
//!
//! # Load a saved frame and print its segments as JSON
//! coilsag --config frame.toml curve --json
//!
//! # Animate the shock settling into sag
//! coilsag simulate --frames 600 --fps 60
//!
//! # Measure a frame's curve from its traced linkage, eight points
//! coilsag --preset flat --points 1,1,1,1,1,1,1,1 linkage patrol.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leverage::{CurveConfig, CurvePreset, Datasheet, rear_bias_from_percent};
use tracing::debug;

/// Sag calculator and shock simulator for coil-sprung rear suspension.
///
/// Works from a normalized leverage curve, wheel travel and shock stroke,
/// rider weight, rear tire bias and spring rate.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "coilsag",
    author,
    version,
    about = "Sag calculator and shock simulator for coil-sprung bikes",
    long_about = "Computes static sag for a coil shock from the frame's leverage curve, \
                  prints the stroke transform, and simulates the shock settling under load."
)]
pub struct Cli {
    /// Load curve settings from a TOML or JSON file
    ///
    /// Flags given on the command line override values from the file
    #[arg(long, short = 'c', env = "COILSAG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Replace the curve with a preset shape
    ///
    /// Available presets: mp, p, flat, d, md
    #[arg(long, short = 'p', global = true)]
    pub preset: Option<CurvePreset>,

    /// Rear wheel travel in mm
    #[arg(long, global = true)]
    pub travel: Option<f64>,

    /// Shock stroke in mm
    #[arg(long, global = true)]
    pub stroke: Option<f64>,

    /// Rider weight in lbf
    #[arg(long, global = true)]
    pub rider_weight: Option<f64>,

    /// Spring rate in lbf/in
    #[arg(long, global = true)]
    pub spring_weight: Option<f64>,

    /// Share of the rider's weight on the rear wheel, in percent
    #[arg(long, global = true)]
    pub rear_bias: Option<f64>,

    /// Comma-separated normalized control points, e.g. 1.1,1.0,0.95
    ///
    /// Applied after --preset
    #[arg(long, value_delimiter = ',', global = true)]
    pub points: Option<Vec<f64>>,

    /// How far control points may stray from 1.0 when editing
    #[arg(long, global = true)]
    pub max_leverage_multiplier: Option<f64>,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    ///
    /// `RUST_LOG` takes precedence when set
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to run (defaults to `sag`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute static sag
    Sag(SagArgs),

    /// Print the piecewise travel-to-stroke transform
    Curve(CurveArgs),

    /// Run the shock simulation headless and print positions as CSV
    Simulate(SimulateArgs),

    /// Measure the leverage curve of a bike datasheet's linkage
    ///
    /// Samples are taken at the configured curve resolution
    Linkage(LinkageArgs),
}

/// Arguments for the sag subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct SagArgs {
    /// Also print the equilibrium stroke
    #[arg(long, short = 'd')]
    pub detail: bool,

    /// Print the sag report as JSON
    #[arg(long, conflicts_with = "detail")]
    pub json: bool,
}

/// Arguments for the curve subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct CurveArgs {
    /// Print the segments as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the simulate subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Maximum number of frames to run
    #[arg(long, short = 'n', default_value = "600")]
    pub frames: u32,

    /// Frame rate of the simulated display
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub fps: u32,

    /// Hold the shock unloaded until this frame, then release it
    ///
    /// Without this flag the load is applied from the first frame
    #[arg(long)]
    pub release_at: Option<u32>,
}

/// Arguments for the linkage subcommand.
#[derive(Parser, Debug, Clone)]
pub struct LinkageArgs {
    /// JSON datasheet with the frame's traced joints and links
    pub datasheet: PathBuf,

    /// Print the curve as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse command line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create CLI from iterator (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if argument parsing fails.
    #[cfg(test)]
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Default log filter based on verbosity.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Builds the curve configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, if
    /// the resulting configuration is invalid, or if a control point lies
    /// outside the allowed band.
    pub fn resolve_config(&self) -> Result<CurveConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => CurveConfig::default(),
        };
        self.apply_overrides(&mut config);
        config
            .validate()
            .context("invalid curve configuration")?;
        // Out-of-band curves would reject every later edit
        config
            .check_bounds()
            .context("control points outside the --max-leverage-multiplier band")?;
        Ok(config)
    }

    /// Applies command-line flags on top of `config`.
    pub fn apply_overrides(&self, config: &mut CurveConfig) {
        if let Some(preset) = self.preset {
            config.apply_preset(preset);
        }
        if let Some(points) = &self.points {
            config.points.clone_from(points);
        }
        if let Some(travel) = self.travel {
            config.travel = travel;
        }
        if let Some(stroke) = self.stroke {
            config.stroke = stroke;
        }
        if let Some(rider_weight) = self.rider_weight {
            config.rider_weight = rider_weight;
        }
        if let Some(spring_weight) = self.spring_weight {
            config.spring_weight = spring_weight;
        }
        if let Some(percent) = self.rear_bias {
            config.rear_tire_bias = rear_bias_from_percent(percent);
        }
        if let Some(multiplier) = self.max_leverage_multiplier {
            config.max_leverage_multiplier = multiplier;
        }
    }
}

/// Loads a [`CurveConfig`] from a `.json` file, or TOML for anything else.
///
/// Missing fields take their default values.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_config(path: &Path) -> Result<CurveConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse JSON config {}", path.display()))?
    } else {
        toml::from_str(&text)
            .with_context(|| format!("failed to parse TOML config {}", path.display()))?
    };

    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Loads a bike [`Datasheet`] from JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load_datasheet(path: &Path) -> Result<Datasheet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read datasheet {}", path.display()))?;
    let sheet = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse datasheet {}", path.display()))?;

    debug!(path = %path.display(), "loaded datasheet");
    Ok(sheet)
}
