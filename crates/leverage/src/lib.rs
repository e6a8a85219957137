#![forbid(unsafe_code)]
// Allow these clippy lints for physics/math code readability
#![allow(clippy::must_use_candidate)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::many_single_char_names)]

//! # Leverage
//!
//! Rear suspension leverage curves for coil shocks.
//!
//! Leverage provides:
//! - **Transform**: the piecewise map between wheel travel and shock stroke
//! - **Sag solver**: the stroke where spring force balances rider load
//! - **Point editor**: area-preserving drags of curve control points
//! - **Smoothing**: cubic Hermite interpolation for drawing the curve
//! - **Physics**: a spring-mass-damper animation of the shock
//! - **Kinematics**: leverage curves measured from a frame's linkage
//!
//! Every function is synchronous and recomputes from the [`CurveConfig`] it
//! is given, so results never go stale after an edit.
//!
//! ## Sag Example
//!
//! ```rust
//! use leverage::{compute_sag, CurveConfig, CurvePreset};
//!
//! let config = CurveConfig::default()
//!     .with_travel(150.0)
//!     .with_stroke(50.0)
//!     .with_preset(CurvePreset::Progressive)
//!     .with_rider_weight(180.0)
//!     .with_spring_weight(450.0)
//!     .with_rear_tire_bias(0.35);
//!
//! let report = compute_sag(&config).unwrap();
//! assert!(report.sag_percent > 0.0 && report.sag_percent < 100.0);
//! ```
//!
//! ## Editing Example
//!
//! ```rust
//! use leverage::{evaluate_transform, CurveConfig};
//!
//! let mut config = CurveConfig::default();
//! config.drag_point(0, 0.08);
//!
//! // Segments are rebuilt from the edited points
//! let segments = evaluate_transform(&config).unwrap();
//! assert!(segments[0].m < 0.0);
//! ```
//!
//! ## Units
//!
//! Travel and stroke are configured in millimetres, rider and spring weights
//! in lbf and lbf/in. The transform and sag solver work in inches; the
//! physics works in millimetres and newtons. See [`units`].

pub mod config;
pub mod editor;
pub mod error;
pub mod kinematics;
pub mod physics;
pub mod sag;
pub mod smooth;
pub mod transform;
pub mod units;

pub use config::{
    CurveConfig, CurvePreset, DEFAULT_MAX_LEVERAGE_MULTIPLIER, LeverageBounds, ParsePresetError,
    rear_bias_from_percent,
};
pub use editor::{DragGesture, apply_drag, try_apply_drag};
pub use error::{LeverageError, Result};
pub use kinematics::{Bike, Datasheet, LinkageCurve, Platform};
pub use physics::{
    IdleVelocityBuffer, Mode, PhysicsIntegrator, SimulationState, TickOutput, tick_physics,
};
pub use sag::{SagReport, compute_sag, sag_percentage, solve_sag};
pub use smooth::{HermiteSegment, build_segments, sample_curve};
pub use transform::{Segment, evaluate_transform, leverage_at_stroke, total_stroke};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{CurveConfig, CurvePreset, LeverageBounds, rear_bias_from_percent};
    pub use crate::editor::{DragGesture, apply_drag};
    pub use crate::error::{LeverageError, Result};
    pub use crate::kinematics::{Bike, Datasheet, Platform};
    pub use crate::physics::{PhysicsIntegrator, SimulationState, TickOutput, tick_physics};
    pub use crate::sag::{SagReport, compute_sag, sag_percentage, solve_sag};
    pub use crate::smooth::{build_segments, sample_curve};
    pub use crate::transform::{Segment, evaluate_transform, leverage_at_stroke};
}
