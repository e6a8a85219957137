//! Linkage kinematics: measuring a leverage curve from frame geometry.
//!
//! A [`Platform`] is a set of named joints joined by linkages of fixed
//! length. Fixed joints are bolted to the front triangle; everything else
//! moves. Shortening the shock linkage and re-solving the platform moves the
//! axle, and the ratio of axle movement to shock movement is the leverage.
//!
//! The solver is iterative constraint relaxation. Each sweep walks the
//! linkages in insertion order and pushes (or pulls) their free ends along
//! the linkage until its length error is mostly gone:
//!
//! ```text
//! e    = target − |b − a|
//! u    = (b − a) / |b − a|
//! step = 0.9 · e / (number of free ends)
//! a   −= u · step,  b += u · step
//! ```
//!
//! Sweeps repeat until the summed `|e|` over every linkage drops below
//! [`SOLVE_TOLERANCE`]. Correcting slightly less than the full error stops
//! symmetric linkages from undoing each other's work on every sweep.
//!
//! [`Bike::leverage_curve`] samples the shock through its stroke and
//! [`Bike::quantized_leverage_curve`] reduces the samples to evenly spaced
//! control points a [`CurveConfig`] can carry.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::CurveConfig;
use crate::editor::rebalance_area;
use crate::error::{LeverageError, Result};

/// Summed length error at which a platform counts as solved.
pub const SOLVE_TOLERANCE: f64 = 1e-5;

/// Sweeps over every linkage before [`Platform::solve`] gives up.
pub const MAX_SWEEPS: usize = 1_000_000;

/// Shock positions sampled across the stroke by [`Bike::leverage_curve`].
pub const CURVE_SAMPLES: usize = 100;

/// Share of a linkage's length error corrected per adjustment.
const RELAXATION: f64 = 0.9;

/// Relative stroke error the raw curve is corrected to.
const AREA_TOLERANCE: f64 = 1e-5;

/// Cap on raw curve correction steps.
const MAX_CORRECTIONS: usize = 10_000;

/// Each correction step moves the raw curve by this share of its minimum.
const CORRECTION_STEP: f64 = 1e-5;

/// Datasheet coordinates are screen pixels with y growing downward; they are
/// mirrored about this line to get y growing upward.
const SCREEN_FLIP: f64 = 100_000.0;

/// Handle to a joint on a [`Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId(usize);

/// Handle to a linkage on a [`Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(usize);

/// A pivot point.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Name from the datasheet.
    pub name: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position, growing upward.
    pub y: f64,
    /// Fixed joints never move while solving.
    pub fixed: bool,
}

impl Joint {
    /// Straight-line distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A rigid member between two joints.
#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    /// Name from the datasheet.
    pub name: String,
    /// First end.
    pub a: JointId,
    /// Second end.
    pub b: JointId,
    /// Length the solver drives this linkage towards.
    pub target: Option<f64>,
}

/// A system of joints and length-constrained linkages.
///
/// # Example
///
/// ```rust
/// use leverage::kinematics::Platform;
///
/// let mut platform = Platform::new();
/// let axle = platform.add_joint("axle", 0.0, 0.0);
/// let pivot = platform.add_joint("pivot", 10.0, 0.0);
/// let mount = platform.add_joint("shock mount", 10.0, 10.0);
/// platform.fix_joint(pivot);
/// platform.fix_joint(mount);
///
/// let swing_arm = platform.add_linkage("swing arm", axle, pivot).unwrap();
/// let shock = platform.add_linkage("shock", axle, mount).unwrap();
/// platform.constrain_current_length(swing_arm);
/// platform.constrain_length(shock, 10.0);
///
/// platform.solve().unwrap();
/// assert!((platform.joint(axle).y - 5.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Platform {
    joints: Vec<Joint>,
    linkages: Vec<Linkage>,
}

impl Platform {
    /// Creates an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free joint.
    pub fn add_joint(&mut self, name: impl Into<String>, x: f64, y: f64) -> JointId {
        self.joints.push(Joint {
            name: name.into(),
            x,
            y,
            fixed: false,
        });
        JointId(self.joints.len() - 1)
    }

    /// Pins a joint in place.
    pub fn fix_joint(&mut self, id: JointId) {
        self.joints[id.0].fixed = true;
    }

    /// The joint behind `id`.
    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.0]
    }

    /// All joints, in insertion order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Looks a joint up by name.
    pub fn find_joint(&self, name: &str) -> Option<JointId> {
        self.joints.iter().position(|j| j.name == name).map(JointId)
    }

    /// Joins two joints with an unconstrained linkage.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::DuplicateLinkage`] if a linkage with the
    /// same name already exists.
    pub fn add_linkage(
        &mut self,
        name: impl Into<String>,
        a: JointId,
        b: JointId,
    ) -> Result<LinkId> {
        let name = name.into();
        if self.linkages.iter().any(|l| l.name == name) {
            return Err(LeverageError::DuplicateLinkage(name));
        }
        self.linkages.push(Linkage {
            name,
            a,
            b,
            target: None,
        });
        Ok(LinkId(self.linkages.len() - 1))
    }

    /// The linkage behind `id`.
    pub fn linkage(&self, id: LinkId) -> &Linkage {
        &self.linkages[id.0]
    }

    /// All linkages, in solve order.
    pub fn linkages(&self) -> &[Linkage] {
        &self.linkages
    }

    /// Current distance between the linkage's joints.
    pub fn length(&self, id: LinkId) -> f64 {
        let link = &self.linkages[id.0];
        self.joint(link.a).distance(self.joint(link.b))
    }

    /// Sets the length the solver drives the linkage towards.
    pub fn constrain_length(&mut self, id: LinkId, length: f64) {
        self.linkages[id.0].target = Some(length);
    }

    /// Locks the linkage at its current length.
    pub fn constrain_current_length(&mut self, id: LinkId) {
        let length = self.length(id);
        self.constrain_length(id, length);
    }

    /// `target - length` for one linkage; zero while unconstrained.
    pub fn link_error(&self, id: LinkId) -> f64 {
        self.linkages[id.0]
            .target
            .map_or(0.0, |target| target - self.length(id))
    }

    /// Summed absolute length error over every linkage.
    pub fn error(&self) -> f64 {
        (0..self.linkages.len())
            .map(|i| self.link_error(LinkId(i)).abs())
            .sum()
    }

    /// Moves the free joints until every linkage is at its target length.
    ///
    /// Returns the number of sweeps taken.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::UnconstrainedLinkage`] if any linkage has no
    /// target, and [`LeverageError::Unsolvable`] if the error is still above
    /// [`SOLVE_TOLERANCE`] after [`MAX_SWEEPS`] sweeps or stops being finite.
    pub fn solve(&mut self) -> Result<usize> {
        if let Some(link) = self.linkages.iter().find(|l| l.target.is_none()) {
            return Err(LeverageError::UnconstrainedLinkage(link.name.clone()));
        }

        let mut error = self.error();
        let mut sweeps = 0;
        while error > SOLVE_TOLERANCE || !error.is_finite() {
            if sweeps == MAX_SWEEPS || !error.is_finite() {
                return Err(LeverageError::Unsolvable { sweeps, error });
            }
            for i in 0..self.linkages.len() {
                self.adjust(LinkId(i));
            }
            error = self.error();
            sweeps += 1;
        }

        trace!(sweeps, error, "platform solved");
        Ok(sweeps)
    }

    fn adjust(&mut self, id: LinkId) {
        let link = &self.linkages[id.0];
        let Some(target) = link.target else {
            return;
        };
        let (ia, ib) = (link.a.0, link.b.0);
        let (a, b) = (&self.joints[ia], &self.joints[ib]);
        let (move_a, move_b) = (!a.fixed, !b.fixed);
        let free_ends = usize::from(move_a) + usize::from(move_b);
        if free_ends == 0 {
            return;
        }

        let (run, rise) = (b.x - a.x, b.y - a.y);
        let length = run.hypot(rise);
        let error = target - length;
        if error == 0.0 {
            return;
        }

        // Coincident joints separate vertically
        let (ux, uy) = if length > 0.0 {
            (run / length, rise / length)
        } else {
            (0.0, 1.0)
        };
        let step = RELAXATION * error / free_ends as f64;

        if move_a {
            let a = &mut self.joints[ia];
            a.x -= ux * step;
            a.y -= uy * step;
        }
        if move_b {
            let b = &mut self.joints[ib];
            b.x += ux * step;
            b.y += uy * step;
        }
    }
}

/// Leverage sampled against vertical wheel travel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageCurve {
    /// Wheel travel of each sample, in the bike's travel units.
    pub travel: Vec<f64>,
    /// Leverage at each sample.
    pub leverage: Vec<f64>,
}

impl LinkageCurve {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.travel.len()
    }

    /// Returns true if the curve has no samples.
    pub fn is_empty(&self) -> bool {
        self.travel.is_empty()
    }

    /// Index of the first sample closest to `travel`.
    pub fn nearest_sample(&self, travel: f64) -> usize {
        let mut best = (0, f64::INFINITY);
        for (i, &sample) in self.travel.iter().enumerate() {
            let distance = (sample - travel).abs();
            if distance < best.1 {
                best = (i, distance);
            }
        }
        best.0
    }

    /// Left Riemann sum of `1 / leverage` over travel: the stroke the
    /// samples account for.
    pub fn reciprocal_area(&self) -> f64 {
        reciprocal_area(&self.travel, &self.leverage)
    }
}

fn reciprocal_area(travel: &[f64], leverage: &[f64]) -> f64 {
    travel
        .windows(2)
        .zip(leverage)
        .map(|(pair, l)| (pair[1] - pair[0]) / l)
        .sum()
}

/// Nudges every sample by the same small amount until the reciprocal area
/// matches `stroke`. Returns the steps taken and the final relative error.
fn correct_area(travel: &[f64], leverage: &mut [f64], stroke: f64) -> (usize, f64) {
    let relative_error =
        |leverage: &[f64]| (reciprocal_area(travel, leverage) - stroke) / stroke;

    let mut error = relative_error(leverage);
    let mut corrections = 0;
    while error.abs() > AREA_TOLERANCE && corrections < MAX_CORRECTIONS {
        let min = leverage.iter().copied().fold(f64::INFINITY, f64::min);
        // Too little stroke: lower the leverage
        let adjustment = (min * CORRECTION_STEP).copysign(error);
        for l in leverage.iter_mut() {
            *l += adjustment;
        }
        error = relative_error(leverage);
        corrections += 1;
    }
    (corrections, error)
}

/// A frame's linkage plus the dimensions its leverage is scaled to.
#[derive(Debug, Clone, PartialEq)]
pub struct Bike {
    platform: Platform,
    axle: JointId,
    shock: LinkId,
    shock_shadow: Option<LinkId>,
    /// Rear wheel travel in mm.
    pub travel: f64,
    /// Shock eye-to-eye length in mm.
    pub eye_to_eye: f64,
    /// Shock stroke in mm.
    pub stroke: f64,
}

impl Bike {
    /// Creates a bike from a solved platform.
    ///
    /// Every linkage except the shock should already be constrained.
    pub fn new(
        platform: Platform,
        axle: JointId,
        shock: LinkId,
        travel: f64,
        eye_to_eye: f64,
        stroke: f64,
    ) -> Self {
        Self {
            platform,
            axle,
            shock,
            shock_shadow: None,
            travel,
            eye_to_eye,
            stroke,
        }
    }

    /// Sets a linkage that shortens in step with the shock, such as the
    /// slider of an inline linkage.
    pub fn with_shock_shadow(mut self, link: LinkId) -> Self {
        self.shock_shadow = Some(link);
        self
    }

    /// Builds a bike from a parsed datasheet.
    ///
    /// Joint coordinates are flipped from screen space (y down, and x
    /// mirrored when `reverse_x` is set). Every linkage, the shock included,
    /// is constrained to its drawn length.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::InvalidDatasheet`] when a dimension, the
    /// axle or the shock is missing, when either is declared twice, or when
    /// a linkage names an unknown joint or joins a joint to itself.
    /// Returns [`LeverageError::DuplicateLinkage`] for repeated link names.
    pub fn from_datasheet(sheet: &Datasheet) -> Result<Self> {
        let invalid = LeverageError::InvalidDatasheet;
        let kinematics = &sheet.kinematics;

        let mut platform = Platform::new();
        let mut axle = None;
        for entry in &kinematics.joints {
            if platform.find_joint(&entry.name).is_some() {
                return Err(invalid(format!("duplicate joint `{}`", entry.name)));
            }
            let x = if kinematics.reverse_x {
                SCREEN_FLIP - entry.x
            } else {
                entry.x
            };
            let id = platform.add_joint(entry.name.as_str(), x, SCREEN_FLIP - entry.y);
            if entry.is_fixed {
                platform.fix_joint(id);
            }
            if entry.is_axle {
                if axle.is_some() {
                    return Err(invalid("more than one axle is defined".into()));
                }
                axle = Some(id);
            }
        }
        let axle = axle.ok_or_else(|| invalid("no axle is defined".into()))?;

        let mut shock = None;
        let mut shock_shadow = None;
        for entry in &kinematics.links {
            let lookup = |joint: &str| {
                platform.find_joint(joint).ok_or_else(|| {
                    invalid(format!(
                        "link `{}` references unknown joint `{joint}`",
                        entry.name
                    ))
                })
            };
            let (a, b) = (lookup(&entry.j1)?, lookup(&entry.j2)?);
            if a == b {
                return Err(invalid(format!(
                    "link `{}` joins `{}` to itself",
                    entry.name, entry.j1
                )));
            }

            let id = platform.add_linkage(entry.name.as_str(), a, b)?;
            platform.constrain_current_length(id);
            if entry.is_shock {
                if shock.is_some() {
                    return Err(invalid("more than one shock is defined".into()));
                }
                shock = Some(id);
            }
            if entry.is_shock_shadow {
                shock_shadow = Some(id);
            }
        }
        let shock = shock.ok_or_else(|| invalid("no shock is defined".into()))?;

        let travel = sheet
            .wheel_travel
            .ok_or_else(|| invalid("wheel_travel not defined".into()))?;
        let eye_to_eye = sheet
            .eye_to_eye
            .ok_or_else(|| invalid("eyetoeye not defined".into()))?;
        let stroke = sheet
            .stroke
            .ok_or_else(|| invalid("stroke not defined".into()))?;

        debug!(
            joints = platform.joints().len(),
            linkages = platform.linkages().len(),
            travel,
            stroke,
            "loaded bike datasheet"
        );
        Ok(Self {
            platform,
            axle,
            shock,
            shock_shadow,
            travel,
            eye_to_eye,
            stroke,
        })
    }

    /// The bike's linkage at rest.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The rear axle joint.
    pub fn axle(&self) -> &Joint {
        self.platform.joint(self.axle)
    }

    /// The shock linkage.
    pub fn shock(&self) -> LinkId {
        self.shock
    }

    /// The linkage that shortens with the shock, if any.
    pub fn shock_shadow(&self) -> Option<LinkId> {
        self.shock_shadow
    }

    fn check_dimensions(&self) -> Result<()> {
        for (name, value) in [
            ("travel", self.travel),
            ("eye-to-eye", self.eye_to_eye),
            ("stroke", self.stroke),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(LeverageError::InvalidDimension { name, value });
            }
        }
        Ok(())
    }

    /// Compresses the shock through its stroke in [`CURVE_SAMPLES`] steps
    /// and records the leverage at each one.
    ///
    /// Travel is vertical axle movement rescaled so the last sample lands
    /// on `travel`; that is the figure frame makers quote. The samples are
    /// then nudged until their reciprocal area equals `stroke`, which
    /// absorbs the error of measuring the frame from a picture.
    ///
    /// The bike itself is not moved.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::InvalidDimension`] for a non-positive
    /// dimension or an axle that ends where it started, any error from
    /// [`Platform::solve`], and [`LeverageError::NonPositiveLeverage`] for
    /// a step where the axle does not move.
    pub fn leverage_curve(&self) -> Result<LinkageCurve> {
        self.check_dimensions()?;

        let mut platform = self.platform.clone();
        let shock_start = platform.length(self.shock);
        let shadow_start = self.shock_shadow.map(|id| (id, platform.length(id)));
        let step = shock_start * self.stroke / self.eye_to_eye / CURVE_SAMPLES as f64;

        let axle_start = platform.joint(self.axle).y;
        let (mut prev_length, mut prev_axle) = (shock_start, axle_start);
        let mut travel = Vec::with_capacity(CURVE_SAMPLES);
        let mut leverage = Vec::with_capacity(CURVE_SAMPLES);

        for i in 1..=CURVE_SAMPLES {
            let removed = step * i as f64;
            platform.constrain_length(self.shock, shock_start - removed);
            if let Some((id, start)) = shadow_start {
                platform.constrain_length(id, start - removed);
            }
            platform.solve()?;

            let length = platform.length(self.shock);
            let axle = platform.joint(self.axle).y;
            let ratio = ((axle - prev_axle) / (length - prev_length)).abs();
            if !(ratio > 0.0 && ratio.is_finite()) {
                return Err(LeverageError::NonPositiveLeverage {
                    segment: i - 1,
                    leverage: ratio,
                });
            }

            travel.push(axle - axle_start);
            leverage.push(ratio);
            prev_length = length;
            prev_axle = axle;
        }

        let full = travel[CURVE_SAMPLES - 1];
        if full == 0.0 || !full.is_finite() {
            return Err(LeverageError::InvalidDimension {
                name: "axle travel",
                value: full,
            });
        }
        for x in &mut travel {
            *x = *x / full * self.travel;
        }

        let (corrections, error) = correct_area(&travel, &mut leverage, self.stroke);
        debug!(corrections, error, "corrected raw leverage curve");
        Ok(LinkageCurve { travel, leverage })
    }

    /// Reduces [`leverage_curve`](Self::leverage_curve) to `resolution`
    /// evenly spaced points.
    ///
    /// Each point takes the nearest raw sample, then the points go through
    /// the same area rebalance as a curve edit so the piecewise transform
    /// maps `travel` onto `stroke`. With `normalized` set, leverage is given
    /// as a multiple of `travel / stroke`, the scale of
    /// [`CurveConfig::points`].
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::InvalidResolution`] for fewer than two
    /// points, anything [`leverage_curve`](Self::leverage_curve) returns,
    /// and [`LeverageError::NonPositiveLeverage`] if the rebalance leaves a
    /// point at or below zero.
    pub fn quantized_leverage_curve(
        &self,
        resolution: usize,
        normalized: bool,
    ) -> Result<LinkageCurve> {
        if resolution < 2 {
            return Err(LeverageError::InvalidResolution(resolution));
        }
        let raw = self.leverage_curve()?;

        let base_leverage = self.travel / self.stroke;
        let spacing = self.travel / (resolution - 1) as f64;
        let travel: Vec<f64> = (0..resolution).map(|i| i as f64 * spacing).collect();
        let mut points: Vec<f64> = travel
            .iter()
            .map(|&x| raw.leverage[raw.nearest_sample(x)] / base_leverage)
            .collect();
        rebalance_area(&mut points);

        if let Some((segment, &leverage)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| !(**p > 0.0 && p.is_finite()))
        {
            return Err(LeverageError::NonPositiveLeverage { segment, leverage });
        }

        let leverage = if normalized {
            points
        } else {
            points.iter().map(|p| p * base_leverage).collect()
        };
        Ok(LinkageCurve { travel, leverage })
    }

    /// `template` with this bike's travel, stroke and measured curve at the
    /// template's resolution.
    ///
    /// # Errors
    ///
    /// Returns anything [`quantized_leverage_curve`](Self::quantized_leverage_curve)
    /// returns.
    pub fn curve_config(&self, template: &CurveConfig) -> Result<CurveConfig> {
        let curve = self.quantized_leverage_curve(template.resolution(), true)?;
        Ok(template
            .clone()
            .with_travel(self.travel)
            .with_stroke(self.stroke)
            .with_points(curve.leverage))
    }
}

/// A bike datasheet, as JSON.
///
/// Only the fields the linkage solver needs are read; anything else in the
/// file is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasheet {
    /// Rear wheel travel in mm.
    #[serde(default)]
    pub wheel_travel: Option<f64>,
    /// Shock eye-to-eye length in mm.
    #[serde(default, rename = "eyetoeye")]
    pub eye_to_eye: Option<f64>,
    /// Shock stroke in mm.
    #[serde(default)]
    pub stroke: Option<f64>,
    /// Frame geometry traced from a side-on picture.
    pub kinematics: KinematicsSheet,
}

/// Joints and links traced from a picture of the frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicsSheet {
    /// Mirror x, for pictures of the drive side facing left.
    #[serde(default)]
    pub reverse_x: bool,
    /// Pivots, in screen pixels.
    #[serde(default)]
    pub joints: Vec<JointSpec>,
    /// Rigid members between pivots.
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

/// One pivot of a datasheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    pub x: f64,
    /// Pixels down from the top of the picture.
    pub y: f64,
    /// Bolted to the front triangle.
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub is_axle: bool,
}

/// One link of a datasheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub name: String,
    pub j1: String,
    pub j2: String,
    #[serde(default)]
    pub is_shock: bool,
    /// Shortens along with the shock.
    #[serde(default)]
    pub is_shock_shadow: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{evaluate_transform, total_stroke};
    use crate::units::inches_to_mm;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    /// Single pivot with the shock running straight to the axle.
    fn single_pivot(sx: f64, sy: f64) -> (Platform, JointId, LinkId) {
        let mut platform = Platform::new();
        let axle = platform.add_joint("axle", 0.0, 0.0);
        let pivot = platform.add_joint("pivot", 10.0 * sx, 0.0);
        let mount = platform.add_joint("shock mount", 10.0 * sx, 10.0 * sy);
        platform.fix_joint(pivot);
        platform.fix_joint(mount);

        let swing_arm = platform.add_linkage("swing arm", axle, pivot).unwrap();
        let shock = platform.add_linkage("shock", axle, mount).unwrap();
        platform.constrain_current_length(swing_arm);
        platform.constrain_current_length(shock);
        (platform, axle, shock)
    }

    const PATROL: &str = r#"{
        "wheel_travel": 160,
        "eyetoeye": 205,
        "stroke": 60,
        "kinematics": {
            "img": "patrol.png",
            "joints": [
                {"name": "axle", "x": 32, "y": 284, "is_axle": true},
                {"name": "chainstay left", "x": 55, "y": 290},
                {"name": "chainstay right", "x": 184, "y": 276, "is_fixed": true},
                {"name": "seatstay top", "x": 175, "y": 206},
                {"name": "triangle bottom", "x": 207, "y": 216, "is_fixed": true},
                {"name": "shock top", "x": 226, "y": 200},
                {"name": "shock bottom", "x": 223, "y": 272, "is_fixed": true}
            ],
            "links": [
                {"name": "chainstay", "j1": "chainstay left", "j2": "chainstay right"},
                {"name": "seatstay", "j1": "axle", "j2": "seatstay top"},
                {"name": "seatstay bottom", "j1": "axle", "j2": "chainstay left"},
                {"name": "seatstay brace", "j1": "seatstay top", "j2": "chainstay left"},
                {"name": "ttop", "j1": "shock top", "j2": "seatstay top"},
                {"name": "tleft", "j1": "triangle bottom", "j2": "seatstay top"},
                {"name": "tright", "j1": "triangle bottom", "j2": "shock top"},
                {"name": "shock", "j1": "shock top", "j2": "shock bottom", "is_shock": true}
            ]
        }
    }"#;

    fn patrol_sheet() -> Datasheet {
        serde_json::from_str(PATROL).unwrap()
    }

    fn patrol() -> Bike {
        Bike::from_datasheet(&patrol_sheet()).unwrap()
    }

    // =========================================================================
    // Platform
    // =========================================================================

    #[test]
    fn test_unchanged_platform_needs_no_sweeps() {
        let (mut platform, axle, _) = single_pivot(1.0, 1.0);
        assert_eq!(platform.solve().unwrap(), 0);
        assert_eq!(platform.joint(axle).x, 0.0);
        assert_eq!(platform.joint(axle).y, 0.0);
    }

    #[test]
    fn test_single_pivot_follows_shock_in_every_quadrant() {
        for (sx, sy) in [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
            let (mut platform, axle, shock) = single_pivot(sx, sy);

            // Circle intersections around the pivot and the shock mount
            platform.constrain_length(shock, 10.0);
            platform.solve().unwrap();
            let j = platform.joint(axle);
            assert!(close(j.x, sx * (10.0 - 75.0_f64.sqrt()), 1e-4), "{sx},{sy}: {j:?}");
            assert!(close(j.y, sy * 5.0, 1e-4), "{sx},{sy}: {j:?}");

            platform.constrain_length(shock, 15.0);
            platform.solve().unwrap();
            let j = platform.joint(axle);
            assert!(close(j.x, sx * (10.0 - 98.4375_f64.sqrt()), 1e-4), "{j:?}");
            assert!(close(j.y, sy * -1.25, 1e-4), "{j:?}");

            let pivot = platform.find_joint("pivot").unwrap();
            let mount = platform.find_joint("shock mount").unwrap();
            assert_eq!((platform.joint(pivot).x, platform.joint(pivot).y), (10.0 * sx, 0.0));
            assert_eq!(
                (platform.joint(mount).x, platform.joint(mount).y),
                (10.0 * sx, 10.0 * sy)
            );
        }
    }

    #[test]
    fn test_vertical_linkage_grows_and_shrinks() {
        let mut platform = Platform::new();
        let top = platform.add_joint("top", 0.0, 10.0);
        let bottom = platform.add_joint("bottom", 0.0, 0.0);
        platform.fix_joint(top);
        let link = platform.add_linkage("link", top, bottom).unwrap();

        platform.constrain_length(link, 15.0);
        platform.solve().unwrap();
        assert_eq!(platform.joint(bottom).x, 0.0);
        assert!(close(platform.joint(bottom).y, -5.0, 1e-4));

        platform.constrain_length(link, 4.0);
        platform.solve().unwrap();
        assert_eq!(platform.joint(bottom).x, 0.0);
        assert!(close(platform.joint(bottom).y, 6.0, 1e-4));
        assert_eq!(platform.joint(top).y, 10.0);
    }

    #[test]
    fn test_horizontal_linkage_grows() {
        let mut platform = Platform::new();
        let left = platform.add_joint("left", 0.0, 0.0);
        let right = platform.add_joint("right", 10.0, 0.0);
        platform.fix_joint(left);
        let link = platform.add_linkage("link", left, right).unwrap();

        platform.constrain_length(link, 15.0);
        platform.solve().unwrap();
        assert!(close(platform.joint(right).x, 15.0, 1e-4));
        assert_eq!(platform.joint(right).y, 0.0);
    }

    #[test]
    fn test_rocker_keeps_its_member_lengths() {
        let mut platform = Platform::new();
        let a = platform.add_joint("a", 0.0, 0.0);
        let b = platform.add_joint("b", 5.0, 5.0);
        let c = platform.add_joint("c", 7.0, 4.0);
        let d = platform.add_joint("d", 9.0, 5.0);
        let e = platform.add_joint("e", 7.0, 1.0);
        let f = platform.add_joint("f", 9.0, 1.0);
        for fixed in [c, e, f] {
            platform.fix_joint(fixed);
        }

        let members = [(a, e), (a, b), (b, d), (b, c), (c, d)];
        let mut links = Vec::new();
        for (i, (p, q)) in members.into_iter().enumerate() {
            let id = platform.add_linkage(format!("member {i}"), p, q).unwrap();
            platform.constrain_current_length(id);
            links.push((id, platform.length(id)));
        }
        let shock = platform.add_linkage("shock", d, f).unwrap();
        assert_eq!(platform.length(shock), 4.0);

        platform.constrain_length(shock, 2.0);
        platform.solve().unwrap();

        assert!(close(platform.length(shock), 2.0, 1e-4));
        for (id, length) in links {
            assert!(close(platform.length(id), length, 1e-4));
        }
        assert!(platform.error() <= SOLVE_TOLERANCE);
    }

    #[test]
    fn test_unconstrained_linkage_is_rejected() {
        let mut platform = Platform::new();
        let a = platform.add_joint("a", 0.0, 0.0);
        let b = platform.add_joint("b", 1.0, 0.0);
        platform.add_linkage("loose", a, b).unwrap();
        assert_eq!(
            platform.solve(),
            Err(LeverageError::UnconstrainedLinkage("loose".into()))
        );
    }

    #[test]
    fn test_duplicate_linkage_is_rejected() {
        let mut platform = Platform::new();
        let a = platform.add_joint("a", 0.0, 0.0);
        let b = platform.add_joint("b", 1.0, 0.0);
        platform.add_linkage("link", a, b).unwrap();
        assert_eq!(
            platform.add_linkage("link", b, a),
            Err(LeverageError::DuplicateLinkage("link".into()))
        );
    }

    #[test]
    fn test_pinned_linkage_cannot_be_solved() {
        let mut platform = Platform::new();
        let a = platform.add_joint("a", 0.0, 0.0);
        let b = platform.add_joint("b", 3.0, 4.0);
        platform.fix_joint(a);
        platform.fix_joint(b);
        let link = platform.add_linkage("link", a, b).unwrap();
        platform.constrain_length(link, 6.0);

        match platform.solve() {
            Err(LeverageError::Unsolvable { sweeps, error }) => {
                assert_eq!(sweeps, MAX_SWEEPS);
                assert!(close(error, 1.0, 1e-12));
            }
            other => panic!("expected Unsolvable, got {other:?}"),
        }
    }

    // =========================================================================
    // Bike
    // =========================================================================

    #[test]
    fn test_datasheet_flips_screen_coordinates() {
        let bike = patrol();
        assert_eq!(bike.axle().name, "axle");
        assert_eq!(bike.axle().x, 32.0);
        assert_eq!(bike.axle().y, 100_000.0 - 284.0);
        assert_eq!(bike.platform().linkage(bike.shock()).name, "shock");
        assert!(bike.shock_shadow().is_none());
        assert_eq!((bike.travel, bike.eye_to_eye, bike.stroke), (160.0, 205.0, 60.0));
        assert!(bike.platform().linkages().iter().all(|l| l.target.is_some()));
    }

    #[test]
    fn test_raw_curve_spans_travel_and_matches_stroke() {
        let curve = patrol().leverage_curve().unwrap();

        assert_eq!(curve.len(), CURVE_SAMPLES);
        assert_eq!(curve.travel[CURVE_SAMPLES - 1], 160.0);
        assert!(curve.travel.windows(2).all(|w| w[1] > w[0]));
        assert!(close(curve.reciprocal_area(), 60.0, 60.0 * 1e-5));
        // Falling rate across the stroke
        assert!(close(curve.leverage[0], 3.1654, 1e-3), "{}", curve.leverage[0]);
        assert!(close(curve.leverage[99], 2.2770, 1e-3), "{}", curve.leverage[99]);
    }

    #[test]
    fn test_leverage_curve_leaves_bike_at_rest() {
        let bike = patrol();
        let before = bike.platform().clone();
        bike.leverage_curve().unwrap();
        assert_eq!(bike.platform(), &before);
    }

    #[test]
    fn test_quantized_curve_matches_measured_shape() {
        let expected = [1.2020, 1.1162, 1.0329, 0.9627, 0.9054, 0.8616];
        let bike = patrol();

        let normalized = bike.quantized_leverage_curve(6, true).unwrap();
        assert_eq!(normalized.travel, vec![0.0, 32.0, 64.0, 96.0, 128.0, 160.0]);
        for (got, want) in normalized.leverage.iter().zip(expected) {
            assert!(close(*got, want, 1e-3), "{:?}", normalized.leverage);
        }

        let absolute = bike.quantized_leverage_curve(6, false).unwrap();
        for (abs, norm) in absolute.leverage.iter().zip(&normalized.leverage) {
            assert!(close(*abs, norm * 160.0 / 60.0, 1e-12));
        }
    }

    #[test]
    fn test_quantize_rejects_low_resolution() {
        assert_eq!(
            patrol().quantized_leverage_curve(1, true),
            Err(LeverageError::InvalidResolution(1))
        );
    }

    #[test]
    fn test_curve_config_maps_travel_onto_stroke() {
        let template = CurveConfig::default().with_rider_weight(190.0);
        let config = patrol().curve_config(&template).unwrap();

        assert_eq!(config.resolution(), template.resolution());
        assert_eq!((config.travel, config.stroke), (160.0, 60.0));
        assert_eq!(config.rider_weight, 190.0);

        let segments = evaluate_transform(&config).unwrap();
        let stroke_mm = inches_to_mm(total_stroke(&segments));
        assert!(close(stroke_mm, 60.0, 0.05), "{stroke_mm}");

        // Measured curves overshoot the default editing band
        assert!(config.check_bounds().is_err());
        assert!(config.with_max_leverage_multiplier(0.3).check_bounds().is_ok());
    }

    #[test]
    fn test_reverse_x_mirrors_without_changing_the_curve() {
        let mut sheet = patrol_sheet();
        sheet.kinematics.reverse_x = true;
        let mirrored = Bike::from_datasheet(&sheet).unwrap();
        assert_eq!(mirrored.axle().x, 100_000.0 - 32.0);

        let a = patrol().quantized_leverage_curve(6, true).unwrap();
        let b = mirrored.quantized_leverage_curve(6, true).unwrap();
        for (x, y) in a.leverage.iter().zip(&b.leverage) {
            assert!(close(*x, *y, 1e-6));
        }
    }

    #[test]
    fn test_datasheet_shock_shadow() {
        let mut sheet = patrol_sheet();
        sheet.kinematics.links[6].is_shock_shadow = true;
        let bike = Bike::from_datasheet(&sheet).unwrap();
        let shadow = bike.shock_shadow().unwrap();
        assert_eq!(bike.platform().linkage(shadow).name, "tright");
    }

    fn reject(edit: impl FnOnce(&mut Datasheet)) -> String {
        let mut sheet = patrol_sheet();
        edit(&mut sheet);
        match Bike::from_datasheet(&sheet) {
            Err(LeverageError::InvalidDatasheet(msg)) => msg,
            other => panic!("expected InvalidDatasheet, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_datasheets_are_rejected() {
        assert_eq!(
            reject(|s| s.kinematics.joints[0].is_axle = false),
            "no axle is defined"
        );
        assert_eq!(
            reject(|s| s.kinematics.joints[1].is_axle = true),
            "more than one axle is defined"
        );
        assert_eq!(
            reject(|s| s.kinematics.links[7].is_shock = false),
            "no shock is defined"
        );
        assert_eq!(
            reject(|s| s.kinematics.links[0].is_shock = true),
            "more than one shock is defined"
        );
        assert_eq!(
            reject(|s| s.kinematics.links[0].j2 = "bottom bracket".into()),
            "link `chainstay` references unknown joint `bottom bracket`"
        );
        assert_eq!(
            reject(|s| s.kinematics.links[0].j2 = "chainstay left".into()),
            "link `chainstay` joins `chainstay left` to itself"
        );
        assert_eq!(
            reject(|s| s.kinematics.joints[1].name = "axle".into()),
            "duplicate joint `axle`"
        );
        assert_eq!(reject(|s| s.stroke = None), "stroke not defined");
        assert_eq!(reject(|s| s.eye_to_eye = None), "eyetoeye not defined");
    }

    #[test]
    fn test_non_positive_dimension_is_rejected() {
        let mut bike = patrol();
        bike.stroke = 0.0;
        assert_eq!(
            bike.leverage_curve(),
            Err(LeverageError::InvalidDimension {
                name: "stroke",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_stationary_axle_has_no_leverage() {
        // Shock mounted to the front triangle at both ends
        let mut platform = Platform::new();
        let axle = platform.add_joint("axle", 0.0, 0.0);
        let pivot = platform.add_joint("pivot", 10.0, 0.0);
        let top = platform.add_joint("top", 20.0, 10.0);
        let eye = platform.add_joint("eye", 20.0, 0.0);
        platform.fix_joint(pivot);
        platform.fix_joint(top);
        let swing_arm = platform.add_linkage("swing arm", axle, pivot).unwrap();
        platform.constrain_current_length(swing_arm);
        let shock = platform.add_linkage("shock", top, eye).unwrap();
        platform.constrain_current_length(shock);

        let bike = Bike::new(platform, axle, shock, 150.0, 200.0, 50.0);
        assert!(matches!(
            bike.leverage_curve(),
            Err(LeverageError::NonPositiveLeverage { segment: 0, .. })
        ));
    }
}
