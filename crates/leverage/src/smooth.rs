//! Cubic Hermite smoothing of the control points for display.
//!
//! The math elsewhere treats the curve as piecewise linear; this module only
//! produces a smooth line to draw through the same points. Slopes come from
//! finite differences over unit spacing (the average of both sides for
//! interior points, the one available side at the ends).

/// One cubic Hermite interpolant between two adjacent control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteSegment {
    /// Value at `t = 0`.
    pub p0: f64,
    /// Slope at `t = 0`.
    pub m0: f64,
    /// Value at `t = 1`.
    pub p1: f64,
    /// Slope at `t = 1`.
    pub m1: f64,
}

impl HermiteSegment {
    /// Evaluates the interpolant at `t` in `[0, 1]`.
    #[inline]
    pub fn eval(&self, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        (2.0 * t3 - 3.0 * t2 + 1.0) * self.p0
            + (t3 - 2.0 * t2 + t) * self.m0
            + (-2.0 * t3 + 3.0 * t2) * self.p1
            + (t3 - t2) * self.m1
    }
}

/// Finite-difference slope at every control point.
pub fn slopes(points: &[f64]) -> Vec<f64> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let left = (i > 0).then(|| points[i] - points[i - 1]);
            let right = (i + 1 < n).then(|| points[i + 1] - points[i]);
            match (left, right) {
                (Some(l), Some(r)) => (l + r) / 2.0,
                (Some(d), None) | (None, Some(d)) => d,
                (None, None) => 0.0,
            }
        })
        .collect()
}

/// Builds one interpolant per adjacent pair of control points.
///
/// # Example
///
/// ```rust
/// use leverage::build_segments;
///
/// let curve = build_segments(&[1.0, 1.1, 0.9]);
/// assert_eq!(curve.len(), 2);
/// assert_eq!(curve[0].eval(0.0), 1.0);
/// assert_eq!(curve[1].eval(1.0), 0.9);
/// ```
pub fn build_segments(points: &[f64]) -> Vec<HermiteSegment> {
    let slopes = slopes(points);
    points
        .windows(2)
        .zip(slopes.windows(2))
        .map(|(p, m)| HermiteSegment {
            p0: p[0],
            m0: m[0],
            p1: p[1],
            m1: m[1],
        })
        .collect()
}

/// Samples the smoothed curve into a polyline.
///
/// Each segment contributes `samples_per_segment` values at evenly spaced
/// `t` in `[0, 1)`, and the last control point closes the line, giving
/// `(n - 1) * samples_per_segment + 1` values for `n` points.
pub fn sample_curve(points: &[f64], samples_per_segment: usize) -> Vec<f64> {
    let Some(&last) = points.last() else {
        return Vec::new();
    };
    let samples = samples_per_segment.max(1);

    let mut out: Vec<f64> = build_segments(points)
        .iter()
        .flat_map(|segment| (0..samples).map(move |j| segment.eval(j as f64 / samples as f64)))
        .collect();
    out.push(last);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_slopes() {
        let s = slopes(&[1.0, 1.2, 1.0, 0.6]);
        assert!((s[0] - 0.2).abs() < TOLERANCE);
        assert!((s[1] - 0.0).abs() < TOLERANCE);
        assert!((s[2] + 0.3).abs() < TOLERANCE);
        assert!((s[3] + 0.4).abs() < TOLERANCE);
    }

    #[test]
    fn test_interpolates_control_points() {
        let points = [0.9, 1.05, 1.1, 0.95];
        for (i, segment) in build_segments(&points).iter().enumerate() {
            assert!((segment.eval(0.0) - points[i]).abs() < TOLERANCE);
            assert!((segment.eval(1.0) - points[i + 1]).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_flat_points_stay_flat() {
        for segment in build_segments(&[1.0; 5]) {
            for j in 0..=10 {
                assert!((segment.eval(f64::from(j) / 10.0) - 1.0).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_linear_points_stay_linear() {
        let segment = build_segments(&[0.0, 1.0, 2.0])[0];
        assert!((segment.eval(0.25) - 0.25).abs() < TOLERANCE);
        assert!((segment.eval(0.5) - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_sample_curve_length() {
        let samples = sample_curve(&[1.0, 1.1, 0.9, 1.0], 8);
        assert_eq!(samples.len(), 3 * 8 + 1);
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[8], 1.1);
        assert_eq!(*samples.last().unwrap(), 1.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(build_segments(&[]).is_empty());
        assert!(build_segments(&[1.0]).is_empty());
        assert!(sample_curve(&[], 4).is_empty());
        assert_eq!(sample_curve(&[1.0], 4), vec![1.0]);
    }
}
