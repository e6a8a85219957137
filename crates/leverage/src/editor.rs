//! Area-preserving control point editing.
//!
//! Dragging a single control point would change the average leverage of the
//! whole curve, and with it the total stroke the frame maps its travel to.
//! Instead, every edit is followed by a redistribution pass that keeps the
//! area under the inverse curve at the value a flat curve would have:
//!
//! 1. Apply the drag to a copy of the points.
//! 2. Integrate `1 / L(x)` piecewise over unit-width segments.
//! 3. Spread the difference to the target area (`n - 1`) evenly:
//!    `d = (target - area) / (n - 1)`.
//! 4. Rewrite each point through the shifted reciprocal `1 / (1/L(x) + d)`.
//! 5. Reject the whole edit if any point leaves the allowed band.
//!
//! Rejected edits are not errors for the caller: [`apply_drag`] simply
//! returns the unchanged curve for that frame.

use tracing::debug;

use crate::config::{CurveConfig, LeverageBounds};
use crate::error::{LeverageError, Result};
use crate::transform::{fit_line, reciprocal_integral};

/// Applies a drag to `points[idx]` and rebalances the curve.
///
/// A zero (or non-finite) `delta` and an out-of-range `idx` leave the curve
/// untouched.
///
/// # Errors
///
/// Returns [`LeverageError::InvalidResolution`] for fewer than two points
/// and [`LeverageError::ConstraintViolation`] when the rebalanced curve
/// leaves `bounds` or stops being finite.
pub fn try_apply_drag(
    points: &[f64],
    idx: usize,
    delta: f64,
    bounds: LeverageBounds,
) -> Result<Vec<f64>> {
    let n = points.len();
    if n < 2 {
        return Err(LeverageError::InvalidResolution(n));
    }
    if idx >= n || delta == 0.0 || !delta.is_finite() {
        return Ok(points.to_vec());
    }

    let mut tentative = points.to_vec();
    tentative[idx] += delta;
    rebalance_area(&mut tentative);

    let min = tentative.iter().copied().fold(f64::INFINITY, f64::min);
    let max = tentative.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let finite = tentative.iter().all(|p| p.is_finite());

    if !finite || min < bounds.lower || max > bounds.upper {
        return Err(LeverageError::ConstraintViolation {
            min,
            max,
            lower: bounds.lower,
            upper: bounds.upper,
        });
    }

    Ok(tentative)
}

/// Steps 2 to 4 above: shifts every reciprocal by the same amount so the
/// area under `1 / L(x)` over unit-width segments becomes `n - 1`.
///
/// A normalized curve with that area maps the full travel onto exactly the
/// configured stroke. Slices shorter than two points are left alone.
pub(crate) fn rebalance_area(points: &mut [f64]) {
    let segment_count = points.len().saturating_sub(1);
    if segment_count == 0 {
        return;
    }

    let area: f64 = (0..segment_count)
        .map(|i| {
            let (q, p) = (i as f64, (i + 1) as f64);
            let (m, b) = fit_line(q, points[i], p, points[i + 1]);
            reciprocal_integral(m, b, q, p)
        })
        .sum();
    let target_area = segment_count as f64;
    let per_point_diff = (target_area - area) / segment_count as f64;

    for i in 0..segment_count {
        let (q, p) = (i as f64, (i + 1) as f64);
        let (m, b) = fit_line(q, points[i], p, points[i + 1]);
        let recip = |x: f64| 1.0 / (m * x + b) + per_point_diff;

        points[i] = 1.0 / recip(q);
        if i + 1 == segment_count {
            points[i + 1] = 1.0 / recip(p);
        }
    }
}

/// Applies a drag to `points[idx]`, returning the rebalanced curve or the
/// original one if the edit was rejected.
///
/// # Example
///
/// ```rust
/// use leverage::{apply_drag, LeverageBounds};
///
/// let points = vec![1.0; 6];
/// let bounds = LeverageBounds::for_multiplier(0.2);
///
/// let edited = apply_drag(&points, 0, 0.1, bounds);
/// assert!(edited[0] > 1.0);
/// assert!(edited.iter().all(|&p| bounds.contains(p)));
///
/// // Far outside the band: discarded
/// assert_eq!(apply_drag(&points, 0, 5.0, bounds), points);
/// ```
pub fn apply_drag(points: &[f64], idx: usize, delta: f64, bounds: LeverageBounds) -> Vec<f64> {
    try_apply_drag(points, idx, delta, bounds).unwrap_or_else(|err| {
        debug!(idx, delta, %err, "discarding curve edit");
        points.to_vec()
    })
}

impl CurveConfig {
    /// Drags one control point using the config's own bounds.
    ///
    /// Returns true if the edit was committed.
    pub fn drag_point(&mut self, idx: usize, delta: f64) -> bool {
        match try_apply_drag(&self.points, idx, delta, self.bounds()) {
            Ok(points) => {
                self.points = points;
                true
            }
            Err(err) => {
                debug!(idx, delta, %err, "discarding curve edit");
                false
            }
        }
    }
}

/// Pointer drag state for editing the curve on a chart.
///
/// Converts chart coordinates into `(index, delta)` pairs for
/// [`apply_drag`]. Y grows downward, as on a canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragGesture {
    index: Option<usize>,
    prev_y: Option<f64>,
}

impl DragGesture {
    /// Creates an idle gesture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag at chart position `(x, y)`.
    ///
    /// Picks the control point nearest to `x`; presses that do not land on
    /// a control point column leave the gesture without a target.
    pub fn begin(&mut self, x: f64, y: f64, chart_width: f64, resolution: usize) {
        self.prev_y = Some(y);
        self.index = None;
        if resolution < 2 || chart_width <= 0.0 {
            return;
        }

        let column = (x / (chart_width / (resolution - 1) as f64)).round();
        if column >= 0.0 && column < resolution as f64 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = column as usize;
            self.index = Some(index);
        }
    }

    /// Moves the pointer to `y`, returning the point to edit and the delta
    /// to apply, or `None` while no drag is active.
    pub fn drag_to(
        &mut self,
        y: f64,
        chart_height: f64,
        base_leverage: f64,
        max_leverage_multiplier: f64,
    ) -> Option<(usize, f64)> {
        let prev_y = self.prev_y?;
        let index = self.index?;
        let scale = chart_height / (base_leverage * max_leverage_multiplier);
        self.prev_y = Some(y);
        Some((index, (prev_y - y) / scale))
    }

    /// Ends the drag.
    pub fn end(&mut self) {
        self.prev_y = None;
    }

    /// Returns true while a drag is in progress.
    pub fn is_active(&self) -> bool {
        self.prev_y.is_some() && self.index.is_some()
    }

    /// The control point being dragged, if any.
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}
