//! Static sag from spring rate, rider load and the leverage curve.
//!
//! At equilibrium the spring force balances the rider's load multiplied by
//! the leverage at the current stroke position:
//!
//! ```text
//! k·x = w·r·L(x)
//! ```
//!
//! Taking logs and substituting the stroke-space leverage of a segment,
//! `ln L(x) = m·x − m·Y + ln(m·X + b)`, gives the residual solved here:
//!
//! ```text
//! F(x)  = m·x − m·Y + ln(m·X + b) − ln(k·x / (w·r))
//! F'(x) = m − 1/x
//! ```
//!
//! There is no closed-form inverse of the whole piecewise curve, so each
//! segment is tried in turn with Newton-Raphson and the first root that
//! lands inside its own segment wins. When none does, the shock is assumed
//! to bottom out and the solver saturates at full stroke.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::CurveConfig;
use crate::error::{LeverageError, Result};
use crate::transform::{Segment, evaluate_transform, total_stroke};
use crate::units::{MM_PER_INCH, inches_to_mm};

/// Newton-Raphson iteration cap per segment.
pub const MAX_ITERATIONS: usize = 1000;

/// A residual inside `(-TOLERANCE, TOLERANCE)` counts as a root.
pub const TOLERANCE: f64 = 0.01;

/// Starting point for a segment anchored at zero stroke.
///
/// `F'` divides by `x`, so the first segment starts just above zero.
pub const MIN_START: f64 = 1.0 / 9_007_199_254_740_991.0;

/// Finds a root of `f` by Newton-Raphson.
///
/// Iteration stops at the first iterate whose residual is within
/// `tolerance`; the step taken from that iterate is still applied, so the
/// returned value is one Newton step past it.
///
/// # Errors
///
/// Returns [`LeverageError::NonConvergence`] when `max_iterations` steps
/// pass without meeting the tolerance, or when an iterate stops being
/// finite.
///
/// # Example
///
/// ```rust
/// use leverage::sag::newton_raphson;
///
/// let root = newton_raphson(|x| x * x - 2.0, |x| 2.0 * x, 1.0, 100, 1e-12).unwrap();
/// assert!((root - 2f64.sqrt()).abs() < 1e-9);
/// ```
pub fn newton_raphson(
    f: impl Fn(f64) -> f64,
    df: impl Fn(f64) -> f64,
    x0: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Result<f64> {
    let mut x = x0;
    let mut residual = f64::NAN;

    for iteration in 0..max_iterations {
        residual = f(x);
        let converged = residual.abs() < tolerance;
        x -= residual / df(x);
        if !x.is_finite() {
            return Err(LeverageError::NonConvergence {
                iterations: iteration + 1,
                residual,
            });
        }
        if converged {
            trace!(iteration, x, residual, "newton-raphson converged");
            return Ok(x);
        }
    }

    Err(LeverageError::NonConvergence {
        iterations: max_iterations,
        residual,
    })
}

/// Solves the force balance inside one segment.
///
/// # Errors
///
/// Returns [`LeverageError::NonConvergence`] if Newton-Raphson fails.
pub fn solve_segment(
    segment: &Segment,
    spring_weight: f64,
    rider_weight: f64,
    rear_bias: f64,
) -> Result<f64> {
    let Segment { m, b, .. } = *segment;
    let (x_anchor, y_anchor) = (segment.x(), segment.y());
    let log_anchor = (m * x_anchor + b).ln();
    let load = rider_weight * rear_bias;

    let residual = |x: f64| m * x - m * y_anchor + log_anchor - (spring_weight * x / load).ln();
    let derivative = |x: f64| m - 1.0 / x;

    let start = if segment.stroke_q == 0.0 {
        MIN_START
    } else {
        segment.stroke_q
    };

    newton_raphson(residual, derivative, start, MAX_ITERATIONS, TOLERANCE)
}

/// Stroke position (inches) where the spring balances the rider's load.
///
/// Segments are tried in order; a root is accepted only if Newton-Raphson
/// converged and the root lies in `[stroke_q, stroke_p)` of the segment that
/// produced it. If no segment yields one, the final segment's `stroke_p` is
/// returned, i.e. the shock saturates at full stroke.
///
/// # Example
///
/// ```rust
/// use leverage::{evaluate_transform, solve_sag, CurveConfig};
///
/// let config = CurveConfig::default();
/// let segments = evaluate_transform(&config).unwrap();
/// let stroke = solve_sag(400.0, 180.0, 0.33, &segments);
///
/// // Flat 3.0 leverage: 400·x = 180·0.33·3.0
/// assert!((stroke - 0.4455).abs() < 0.01);
/// ```
pub fn solve_sag(
    spring_weight: f64,
    rider_weight: f64,
    rear_bias: f64,
    segments: &[Segment],
) -> f64 {
    // Without load there is nothing to balance and the residual is undefined.
    let load = rider_weight * rear_bias;
    if load.is_nan() || load <= 0.0 {
        return 0.0;
    }

    for (i, segment) in segments.iter().enumerate() {
        match solve_segment(segment, spring_weight, rider_weight, rear_bias) {
            Ok(root) if root >= segment.stroke_q && root < segment.stroke_p => {
                debug!(segment = i, root, "sag root found");
                return root;
            }
            Ok(root) => trace!(segment = i, root, "root outside segment"),
            Err(err) => trace!(segment = i, %err, "segment did not converge"),
        }
    }

    let saturated = total_stroke(segments);
    debug!(saturated, "no sag root in any segment, saturating at full stroke");
    saturated
}

/// Sag as a percentage of shock stroke.
///
/// Rounded to two decimals and clamped to 100 so a solver estimate slightly
/// past full stroke still reads as fully bottomed out.
///
/// ```rust
/// use leverage::sag_percentage;
///
/// assert_eq!(sag_percentage(0.5, 50.8), 25.0);
/// assert_eq!(sag_percentage(2.1, 50.8), 100.0);
/// ```
pub fn sag_percentage(stroke_inches: f64, stroke_mm: f64) -> f64 {
    let percent = inches_to_mm(stroke_inches) / (stroke_mm / 100.0);
    ((percent * 100.0).round() / 100.0).min(100.0)
}

/// Result of a full sag computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SagReport {
    /// Equilibrium stroke position in inches.
    pub stroke_inches: f64,
    /// Equilibrium stroke position in mm.
    pub sag_mm: f64,
    /// Sag as a percentage of stroke, clamped to 100.
    pub sag_percent: f64,
}

/// Evaluates the transform for `config` and solves for sag.
///
/// # Errors
///
/// Propagates configuration and leverage errors from
/// [`evaluate_transform`].
pub fn compute_sag(config: &CurveConfig) -> Result<SagReport> {
    let segments = evaluate_transform(config)?;
    let stroke_inches = solve_sag(
        config.spring_weight,
        config.rider_weight,
        config.rear_tire_bias,
        &segments,
    );

    Ok(SagReport {
        stroke_inches,
        sag_mm: stroke_inches * MM_PER_INCH,
        sag_percent: sag_percentage(stroke_inches, config.stroke),
    })
}
