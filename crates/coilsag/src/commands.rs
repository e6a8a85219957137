//! Subcommand handlers.
//!
//! Each handler writes to any [`Write`] so the output can be checked without
//! spawning the binary.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use leverage::{Bike, CurveConfig, PhysicsIntegrator, compute_sag, evaluate_transform};
use serde::Serialize;
use tracing::info;

use crate::cli::{CurveArgs, LinkageArgs, SagArgs, SimulateArgs, load_datasheet};

/// Prints the sag for `config`.
///
/// # Errors
///
/// Returns an error if the curve cannot be evaluated or output fails.
pub fn sag(config: &CurveConfig, args: &SagArgs, out: &mut impl Write) -> Result<()> {
    let report = compute_sag(config).context("failed to compute sag")?;
    info!(sag_percent = report.sag_percent, "sag computed");

    if args.json {
        let json = serde_json::to_string_pretty(&report)?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(out, "sag: {:.2}%", report.sag_percent)?;
    if args.detail {
        writeln!(
            out,
            "stroke: {:.4} in ({:.2} mm of {:.1} mm)",
            report.stroke_inches, report.sag_mm, config.stroke
        )?;
    }
    Ok(())
}

/// Prints the travel-to-stroke segments for `config`.
///
/// # Errors
///
/// Returns an error if the curve cannot be evaluated or output fails.
pub fn curve(config: &CurveConfig, args: &CurveArgs, out: &mut impl Write) -> Result<()> {
    let segments = evaluate_transform(config).context("failed to evaluate leverage curve")?;

    if args.json {
        let json = serde_json::to_string_pretty(&segments)?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>3}  {:>8}  {:>8}  {:>8}  {:>8}  {:>9}  {:>7}",
        "#", "travel_q", "travel_p", "stroke_q", "stroke_p", "m", "b"
    )?;
    for (i, segment) in segments.iter().enumerate() {
        writeln!(
            out,
            "{i:>3}  {:>8.4}  {:>8.4}  {:>8.4}  {:>8.4}  {:>9.5}  {:>7.4}",
            segment.travel_q,
            segment.travel_p,
            segment.stroke_q,
            segment.stroke_p,
            segment.m,
            segment.b
        )?;
    }
    Ok(())
}

/// Runs the shock simulation on a fixed frame clock and prints CSV rows.
///
/// Stops after `args.frames` frames or once the shock comes to rest under
/// load.
///
/// # Errors
///
/// Returns an error if writing the output fails.
pub fn simulate(config: &CurveConfig, args: &SimulateArgs, out: &mut impl Write) -> Result<()> {
    let frame_secs = 1.0 / f64::from(args.fps);
    let release_at = args.release_at.unwrap_or(0);

    let mut shock = PhysicsIntegrator::new();
    if release_at == 0 {
        shock.release();
    } else {
        shock.press();
    }

    writeln!(out, "frame,pos,simulating")?;
    let mut rows = 0_u32;
    for frame in 0..args.frames {
        if frame == release_at && frame > 0 {
            shock.release();
        }

        let now = Duration::from_secs_f64(f64::from(frame) * frame_secs);
        match shock.tick(now, config) {
            Some(output) => {
                writeln!(out, "{frame},{:.4},{}", output.pos, output.simulating)?;
                rows += 1;
            }
            // Resting while held: wait for the release
            None if frame < release_at => {}
            None => break,
        }
    }

    let state = shock.state();
    info!(rows, pos = state.pos, idle = !shock.is_running(), "simulation finished");
    Ok(())
}

/// A measured curve in both absolute and normalized leverage.
#[derive(Debug, Serialize)]
struct MeasuredCurve {
    travel: Vec<f64>,
    leverage: Vec<f64>,
    points: Vec<f64>,
}

/// Measures the leverage curve of a datasheet's linkage at the resolution
/// of `config` and prints it.
///
/// The last line lists the normalized points in the form `--points` takes.
///
/// # Errors
///
/// Returns an error if the datasheet cannot be loaded, does not describe a
/// usable bike, or the linkage cannot be solved.
pub fn linkage(config: &CurveConfig, args: &LinkageArgs, out: &mut impl Write) -> Result<()> {
    let sheet = load_datasheet(&args.datasheet)?;
    let bike = Bike::from_datasheet(&sheet).context("invalid bike datasheet")?;
    let curve = bike
        .quantized_leverage_curve(config.resolution(), true)
        .context("failed to measure leverage curve")?;
    info!(
        resolution = curve.len(),
        travel = bike.travel,
        stroke = bike.stroke,
        "measured linkage curve"
    );

    let base_leverage = bike.travel / bike.stroke;
    let measured = MeasuredCurve {
        leverage: curve.leverage.iter().map(|p| p * base_leverage).collect(),
        travel: curve.travel,
        points: curve.leverage,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&measured)?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>3}  {:>8}  {:>8}  {:>6}",
        "#", "travel", "leverage", "point"
    )?;
    for (i, ((travel, leverage), point)) in measured
        .travel
        .iter()
        .zip(&measured.leverage)
        .zip(&measured.points)
        .enumerate()
    {
        writeln!(out, "{i:>3}  {travel:>8.2}  {leverage:>8.4}  {point:>6.4}")?;
    }
    let points: Vec<String> = measured.points.iter().map(|p| format!("{p:.4}")).collect();
    writeln!(out, "points: {}", points.join(","))?;
    Ok(())
}
