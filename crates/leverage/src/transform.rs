//! Piecewise leverage transform between wheel travel and shock stroke.
//!
//! The leverage curve is linear between adjacent control points when
//! plotted against wheel travel. Because `d(stroke) = d(travel) / leverage`,
//! each linear piece `L(x) = m·x + b` maps a travel interval `[q, p)` to a
//! stroke interval of width
//!
//! ```text
//! ∫_q^p dx / (m·x + b) = (ln(m·p + b) − ln(m·q + b)) / m     (m ≠ 0)
//!                      = (p − q) / b                          (m = 0)
//! ```
//!
//! Accumulating those widths gives the stroke bounds of every segment, and
//! inverting the same antiderivative gives leverage as a function of stroke:
//!
//! ```text
//! L(s) = exp(m·s − m·Y + ln(m·X + b))
//! ```
//!
//! where `X`/`Y` are the travel and stroke at the start of the segment.
//!
//! All lengths here are in inches. Segments are derived fresh from the
//! config on every call; nothing is cached between calls.

use serde::Serialize;
use tracing::trace;

use crate::config::CurveConfig;
use crate::error::{LeverageError, Result};
use crate::units::mm_to_inches;

/// One linear piece of the leverage curve.
///
/// `travel_q` doubles as the segment's travel anchor `X` and `stroke_q` as
/// its stroke anchor `Y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// Slope of leverage against travel.
    pub m: f64,
    /// Leverage intercept at zero travel.
    pub b: f64,
    /// Travel at the start of the segment (inclusive).
    pub travel_q: f64,
    /// Travel at the end of the segment (exclusive).
    pub travel_p: f64,
    /// Stroke at the start of the segment (inclusive).
    pub stroke_q: f64,
    /// Stroke at the end of the segment (exclusive).
    pub stroke_p: f64,
}

impl Segment {
    /// Travel anchor `X` used by the stroke-space formulas.
    #[inline]
    pub fn x(&self) -> f64 {
        self.travel_q
    }

    /// Stroke anchor `Y` used by the stroke-space formulas.
    #[inline]
    pub fn y(&self) -> f64 {
        self.stroke_q
    }

    /// Leverage at a travel position.
    #[inline]
    pub fn leverage_at_travel(&self, travel: f64) -> f64 {
        self.m * travel + self.b
    }

    /// Leverage at a stroke position, using this segment's formula.
    ///
    /// Only meaningful for `stroke` inside [`Self::contains_stroke`].
    #[inline]
    pub fn leverage_at_stroke(&self, stroke: f64) -> f64 {
        (self.m * stroke - self.m * self.y() + self.leverage_at_travel(self.x()).ln()).exp()
    }

    /// Returns true if `stroke` lies in `[stroke_q, stroke_p)`.
    #[inline]
    pub fn contains_stroke(&self, stroke: f64) -> bool {
        stroke >= self.stroke_q && stroke < self.stroke_p
    }

    /// Stroke consumed by this segment.
    #[inline]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_p - self.stroke_q
    }

    /// Travel covered by this segment.
    #[inline]
    pub fn travel_width(&self) -> f64 {
        self.travel_p - self.travel_q
    }
}

/// Fits `y = m·x + b` through `(x0, y0)` and `(x1, y1)`.
#[inline]
pub(crate) fn fit_line(x0: f64, y0: f64, x1: f64, y1: f64) -> (f64, f64) {
    let m = (y1 - y0) / (x1 - x0);
    (m, y0 - m * x0)
}

/// `∫_q^p dx / (m·x + b)` for a line that stays positive on `[q, p]`.
///
/// Uses `ln_1p` so nearly flat pieces keep their precision instead of
/// dividing a cancelled logarithm difference by a tiny slope.
#[inline]
pub(crate) fn reciprocal_integral(m: f64, b: f64, q: f64, p: f64) -> f64 {
    if m == 0.0 {
        (p - q) / b
    } else {
        (m * (p - q) / (m * q + b)).ln_1p() / m
    }
}

/// Derives the segments of the leverage curve described by `config`.
///
/// Produces exactly `resolution - 1` segments whose travel and stroke bounds
/// chain end to start.
///
/// # Errors
///
/// Returns a configuration error from [`CurveConfig::validate`], or
/// [`LeverageError::NonPositiveLeverage`] if any control point would give a
/// leverage of zero or less.
///
/// # Example
///
/// ```rust
/// use leverage::{evaluate_transform, CurveConfig};
///
/// let config = CurveConfig::default().with_travel(150.0).with_stroke(50.0);
/// let segments = evaluate_transform(&config).unwrap();
///
/// assert_eq!(segments.len(), config.resolution() - 1);
/// let total: f64 = segments.iter().map(|s| s.stroke_width()).sum();
/// assert!((total * 25.4 - 50.0).abs() < 1e-9);
/// ```
pub fn evaluate_transform(config: &CurveConfig) -> Result<Vec<Segment>> {
    config.validate()?;

    let points = &config.points;
    let base_leverage = config.base_leverage();
    let width = mm_to_inches(config.travel) / (points.len() - 1) as f64;

    let mut segments = Vec::with_capacity(points.len() - 1);
    let mut stroke_acc = 0.0;

    for (i, pair) in points.windows(2).enumerate() {
        let y0 = pair[0] * base_leverage;
        let y1 = pair[1] * base_leverage;
        // Linear pieces are positive everywhere iff both ends are.
        if let Some(leverage) = [y0, y1].into_iter().find(|y| !(*y > 0.0 && y.is_finite())) {
            return Err(LeverageError::NonPositiveLeverage {
                segment: i,
                leverage,
            });
        }

        let travel_q = i as f64 * width;
        let travel_p = (i + 1) as f64 * width;
        let (m, b) = fit_line(travel_q, y0, travel_p, y1);
        let stroke_q = stroke_acc;
        let stroke_p = stroke_q + reciprocal_integral(m, b, travel_q, travel_p);

        segments.push(Segment {
            m,
            b,
            travel_q,
            travel_p,
            stroke_q,
            stroke_p,
        });
        stroke_acc = stroke_p;
    }

    trace!(
        segments = segments.len(),
        total_stroke = stroke_acc,
        "evaluated leverage transform"
    );
    Ok(segments)
}

/// Leverage at a stroke position (inches).
///
/// Scans for the segment with `stroke_q <= stroke < stroke_p` and falls back
/// to `base_leverage` when the position is outside every segment, which
/// covers negative positions, full stroke and over-travel.
pub fn leverage_at_stroke(segments: &[Segment], stroke: f64, base_leverage: f64) -> f64 {
    segments
        .iter()
        .find(|segment| segment.contains_stroke(stroke))
        .map_or(base_leverage, |segment| segment.leverage_at_stroke(stroke))
}

/// Total stroke (inches) covered by the segments.
pub fn total_stroke(segments: &[Segment]) -> f64 {
    segments.last().map_or(0.0, |segment| segment.stroke_p)
}
