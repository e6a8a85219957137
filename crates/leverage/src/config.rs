//! Curve configuration: the numeric snapshot every computation reads.
//!
//! A [`CurveConfig`] holds the control points of the leverage curve together
//! with the frame and rider numbers the sag and physics computations need.
//! It is plain data: serializable, cheap to clone, and validated on demand.
//!
//! # Example
//!
//! ```rust
//! use leverage::{CurveConfig, CurvePreset};
//!
//! let config = CurveConfig::default()
//!     .with_travel(160.0)
//!     .with_stroke(62.5)
//!     .with_preset(CurvePreset::Progressive);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.resolution(), 6);
//! assert!((config.base_leverage() - 2.56).abs() < 1e-9);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LeverageError, Result};

/// Default allowed deviation of a control point from 1.0 (±20%).
pub const DEFAULT_MAX_LEVERAGE_MULTIPLIER: f64 = 0.2;

/// Numeric inputs for the leverage curve, sag solver and shock physics.
///
/// `points` are dimensionless multipliers of the base leverage
/// (`travel / stroke`), so a flat curve is all `1.0` regardless of frame.
/// The resolution of the curve is the number of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Control points, evenly spaced across the wheel travel.
    pub points: Vec<f64>,
    /// Rear wheel travel in mm.
    pub travel: f64,
    /// Shock stroke in mm.
    pub stroke: f64,
    /// Rider weight in lbf.
    pub rider_weight: f64,
    /// Spring rate in lbf/in.
    pub spring_weight: f64,
    /// Fraction of the rider's weight carried by the rear wheel, in (0, 1).
    pub rear_tire_bias: f64,
    /// Allowed deviation of any control point from 1.0.
    pub max_leverage_multiplier: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            points: CurvePreset::Flat.points().to_vec(),
            travel: 150.0,
            stroke: 50.0,
            rider_weight: 180.0,
            spring_weight: 400.0,
            rear_tire_bias: 0.35,
            max_leverage_multiplier: DEFAULT_MAX_LEVERAGE_MULTIPLIER,
        }
    }
}

impl CurveConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wheel travel in mm.
    pub fn with_travel(mut self, travel: f64) -> Self {
        self.travel = travel;
        self
    }

    /// Sets the shock stroke in mm.
    pub fn with_stroke(mut self, stroke: f64) -> Self {
        self.stroke = stroke;
        self
    }

    /// Sets the rider weight in lbf.
    pub fn with_rider_weight(mut self, rider_weight: f64) -> Self {
        self.rider_weight = rider_weight;
        self
    }

    /// Sets the spring rate in lbf/in.
    pub fn with_spring_weight(mut self, spring_weight: f64) -> Self {
        self.spring_weight = spring_weight;
        self
    }

    /// Sets the rear tire bias as a fraction.
    pub fn with_rear_tire_bias(mut self, rear_tire_bias: f64) -> Self {
        self.rear_tire_bias = rear_tire_bias;
        self
    }

    /// Sets the allowed control point deviation.
    pub fn with_max_leverage_multiplier(mut self, multiplier: f64) -> Self {
        self.max_leverage_multiplier = multiplier;
        self
    }

    /// Replaces the control points, changing the resolution to match.
    pub fn with_points(mut self, points: Vec<f64>) -> Self {
        self.points = points;
        self
    }

    /// Replaces the control points with a preset curve.
    pub fn with_preset(mut self, preset: CurvePreset) -> Self {
        self.apply_preset(preset);
        self
    }

    /// Replaces the control points with a preset curve in place.
    pub fn apply_preset(&mut self, preset: CurvePreset) {
        self.points = preset.points().to_vec();
    }

    /// Overwrites the control points, keeping the current resolution.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::PointCountMismatch`] if `points` has a
    /// different length than the current curve.
    pub fn set_points(&mut self, points: &[f64]) -> Result<()> {
        if points.len() != self.points.len() {
            return Err(LeverageError::PointCountMismatch {
                expected: self.points.len(),
                actual: points.len(),
            });
        }
        self.points.copy_from_slice(points);
        Ok(())
    }

    /// Number of control points.
    pub fn resolution(&self) -> usize {
        self.points.len()
    }

    /// Average leverage of the frame, `travel / stroke`.
    pub fn base_leverage(&self) -> f64 {
        self.travel / self.stroke
    }

    /// Rider weight carried by the rear wheel, in lbf.
    pub fn norm_weight(&self) -> f64 {
        self.rider_weight * self.rear_tire_bias
    }

    /// Allowed band for control points.
    pub fn bounds(&self) -> LeverageBounds {
        LeverageBounds::for_multiplier(self.max_leverage_multiplier)
    }

    /// Checks the structural requirements every computation relies on.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::InvalidResolution`] for fewer than two
    /// points and [`LeverageError::InvalidDimension`] for a travel or stroke
    /// that is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(LeverageError::InvalidResolution(self.points.len()));
        }
        for (name, value) in [("travel", self.travel), ("stroke", self.stroke)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(LeverageError::InvalidDimension { name, value });
            }
        }
        Ok(())
    }

    /// Checks that every control point lies inside [`bounds`](Self::bounds).
    ///
    /// Not part of [`validate`](Self::validate): the transform and sag
    /// solver work on any positive curve, but the point editor rejects every
    /// drag of a curve that starts outside the band.
    ///
    /// # Errors
    ///
    /// Returns [`LeverageError::ConstraintViolation`] with the curve's range
    /// if any point is outside the band or not finite.
    pub fn check_bounds(&self) -> Result<()> {
        let bounds = self.bounds();
        if self.points.iter().all(|&p| bounds.contains(p)) {
            return Ok(());
        }
        Err(LeverageError::ConstraintViolation {
            min: self.points.iter().copied().fold(f64::INFINITY, f64::min),
            max: self.points.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            lower: bounds.lower,
            upper: bounds.upper,
        })
    }
}

/// Converts a rear tire bias percentage into the fraction used by the math.
///
/// Values at or below zero become 1% and values at or above 99 become 99%,
/// so the bias never reaches either end of the open interval.
///
/// ```rust
/// use leverage::rear_bias_from_percent;
///
/// assert_eq!(rear_bias_from_percent(35.0), 0.35);
/// assert_eq!(rear_bias_from_percent(0.0), 0.01);
/// assert_eq!(rear_bias_from_percent(120.0), 0.99);
/// ```
pub fn rear_bias_from_percent(percent: f64) -> f64 {
    if percent.is_nan() || percent <= 0.0 {
        0.01
    } else if percent >= 99.0 {
        0.99
    } else {
        percent / 100.0
    }
}

/// Band a normalized control point must stay inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageBounds {
    /// Smallest allowed point value.
    pub lower: f64,
    /// Largest allowed point value.
    pub upper: f64,
}

impl LeverageBounds {
    /// Creates bounds from explicit limits.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Creates the symmetric band `1 ± multiplier`.
    pub fn for_multiplier(multiplier: f64) -> Self {
        Self {
            lower: 1.0 - multiplier,
            upper: 1.0 + multiplier,
        }
    }

    /// Returns true if `value` lies inside the band (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// The band expressed as absolute leverage for a frame.
    ///
    /// These are the chart labels: `(base - base*m, base + base*m)`.
    pub fn scaled(&self, base_leverage: f64) -> (f64, f64) {
        (self.lower * base_leverage, self.upper * base_leverage)
    }
}

impl Default for LeverageBounds {
    fn default() -> Self {
        Self::for_multiplier(DEFAULT_MAX_LEVERAGE_MULTIPLIER)
    }
}

/// Built-in six-point curve shapes.
///
/// Each preset is already balanced so that its average inverse leverage
/// matches a flat curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CurvePreset {
    /// Strongly rising rate.
    #[serde(rename = "mp")]
    MoreProgressive,
    /// Rising rate.
    #[serde(rename = "p")]
    Progressive,
    /// Constant leverage.
    #[default]
    #[serde(rename = "flat")]
    Flat,
    /// Falling rate.
    #[serde(rename = "d")]
    Degressive,
    /// Strongly falling rate.
    #[serde(rename = "md")]
    MoreDegressive,
}

const MORE_PROGRESSIVE: [f64; 6] = [
    1.191_072_333_753_793_6,
    1.077_321_708_677_808_6,
    0.997_267_553_860_666_2,
    0.958_355_556_392_723,
    0.936_255_669_709_050_3,
    0.925_005_550_094_092_6,
];

const PROGRESSIVE: [f64; 6] = [
    1.084_466_999_235_050_6,
    1.039_049_992_141_999_8,
    1.004_583_463_915_281_7,
    0.979_967_806_200_006_2,
    0.964_775_403_605_876_9,
    0.952_776_433_342_920_7,
];

const FLAT: [f64; 6] = [1.0; 6];

const DEGRESSIVE: [f64; 6] = [
    0.931_838_762_623_334_6,
    0.971_006_018_504_221_7,
    0.998_018_984_045_125_1,
    1.018_929_325_840_203_5,
    1.031_821_430_332_666_3,
    1.038_362_914_191_078_2,
];

const MORE_DEGRESSIVE: [f64; 6] = [
    0.817_356_771_004_790_9,
    0.927_334_262_825_776_1,
    1.001_647_761_701_074,
    1.058_240_839_433_114,
    1.088_148_362_789_673_8,
    1.105_396_068_785_246_4,
];

impl CurvePreset {
    /// All presets, from most progressive to most degressive.
    pub const ALL: [Self; 5] = [
        Self::MoreProgressive,
        Self::Progressive,
        Self::Flat,
        Self::Degressive,
        Self::MoreDegressive,
    ];

    /// The preset's control points.
    pub const fn points(self) -> &'static [f64; 6] {
        match self {
            Self::MoreProgressive => &MORE_PROGRESSIVE,
            Self::Progressive => &PROGRESSIVE,
            Self::Flat => &FLAT,
            Self::Degressive => &DEGRESSIVE,
            Self::MoreDegressive => &MORE_DEGRESSIVE,
        }
    }

    /// Short name used in config files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoreProgressive => "mp",
            Self::Progressive => "p",
            Self::Flat => "flat",
            Self::Degressive => "d",
            Self::MoreDegressive => "md",
        }
    }
}

impl fmt::Display for CurvePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurvePreset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp" | "more-progressive" => Ok(Self::MoreProgressive),
            "p" | "progressive" => Ok(Self::Progressive),
            "flat" => Ok(Self::Flat),
            "d" | "degressive" => Ok(Self::Degressive),
            "md" | "more-degressive" => Ok(Self::MoreDegressive),
            _ => Err(ParsePresetError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown preset name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown curve preset: {0:?}")]
pub struct ParsePresetError(String);
