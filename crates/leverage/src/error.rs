//! Error types for leverage curve evaluation.
//!
//! # Error Handling Strategy
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | [`InvalidResolution`](LeverageError::InvalidResolution) | config validation | Fatal to that evaluation |
//! | [`PointCountMismatch`](LeverageError::PointCountMismatch) | config validation | Fatal to that evaluation |
//! | [`InvalidDimension`](LeverageError::InvalidDimension) | config validation | Fatal to that evaluation |
//! | [`NonPositiveLeverage`](LeverageError::NonPositiveLeverage) | transform | Surfaced to the caller |
//! | [`NonConvergence`](LeverageError::NonConvergence) | Newton-Raphson | Sag solver saturates at full stroke |
//! | [`ConstraintViolation`](LeverageError::ConstraintViolation) | point editor, `check_bounds` | Edit discarded, curve unchanged |
//! | [`InvalidDatasheet`](LeverageError::InvalidDatasheet) | `Bike::from_datasheet` | Fatal to that bike |
//! | [`DuplicateLinkage`](LeverageError::DuplicateLinkage) | `Platform::add_linkage` | Fatal to that bike |
//! | [`UnconstrainedLinkage`](LeverageError::UnconstrainedLinkage) | `Platform::solve` | Fatal to that solve |
//! | [`Unsolvable`](LeverageError::Unsolvable) | `Platform::solve` | Fatal to that solve |
//!
//! `NonConvergence` and `ConstraintViolation` are produced by the fallible inner operations
//! ([`newton_raphson`](crate::sag::newton_raphson) and
//! [`try_apply_drag`](crate::editor::try_apply_drag)) and recovered by the
//! public contracts built on top of them.

use thiserror::Error;

/// Errors produced by the leverage curve math.
///
/// Implements `Clone` and `PartialEq` so results can be compared in tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeverageError {
    /// The curve has fewer than two control points.
    #[error("curve resolution must be at least 2, got {0}")]
    InvalidResolution(usize),

    /// The control point array does not match the declared resolution.
    #[error("expected {expected} control points, got {actual}")]
    PointCountMismatch {
        /// Declared resolution.
        expected: usize,
        /// Number of points supplied.
        actual: usize,
    },

    /// Travel or stroke is zero, negative, or not finite.
    #[error("{name} must be a positive finite length, got {value}")]
    InvalidDimension {
        /// Which dimension failed (`"travel"` or `"stroke"`).
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A segment's leverage reaches zero or goes negative, which makes the
    /// stroke integral undefined.
    #[error("non-positive leverage {leverage} in segment {segment}")]
    NonPositiveLeverage {
        /// Index of the offending segment.
        segment: usize,
        /// The first non-positive leverage value found.
        leverage: f64,
    },

    /// Newton-Raphson hit its iteration cap without meeting the tolerance.
    #[error("no root after {iterations} iterations (last residual {residual})")]
    NonConvergence {
        /// Iterations performed.
        iterations: usize,
        /// Residual at the final iterate.
        residual: f64,
    },

    /// Curve points left the allowed leverage band.
    #[error("curve points span [{min}, {max}], outside [{lower}, {upper}]")]
    ConstraintViolation {
        /// Smallest point of the rejected curve.
        min: f64,
        /// Largest point of the rejected curve.
        max: f64,
        /// Lower bound of the band.
        lower: f64,
        /// Upper bound of the band.
        upper: f64,
    },

    /// A bike datasheet is missing a required part or references one that
    /// does not exist.
    #[error("invalid datasheet: {0}")]
    InvalidDatasheet(String),

    /// Two linkages on one platform share a name.
    #[error("duplicate linkage `{0}`")]
    DuplicateLinkage(String),

    /// A linkage has no target length to solve towards.
    #[error("linkage `{0}` has no constrained length")]
    UnconstrainedLinkage(String),

    /// Constraint relaxation ran out of sweeps.
    #[error("platform did not settle after {sweeps} sweeps (error {error})")]
    Unsolvable {
        /// Sweeps performed.
        sweeps: usize,
        /// Summed length error after the last sweep.
        error: f64,
    },
}

impl LeverageError {
    /// Returns true if the error comes from rejecting a configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidResolution(_)
                | Self::PointCountMismatch { .. }
                | Self::InvalidDimension { .. }
                | Self::InvalidDatasheet(_)
                | Self::DuplicateLinkage(_)
        )
    }

    /// Returns true if callers are expected to recover from this error
    /// locally instead of propagating it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NonConvergence { .. } | Self::ConstraintViolation { .. }
        )
    }
}

/// A specialized [`Result`] type for leverage operations.
pub type Result<T> = std::result::Result<T, LeverageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(LeverageError::InvalidResolution(1).is_configuration());
        assert!(
            LeverageError::InvalidDimension {
                name: "travel",
                value: 0.0
            }
            .is_configuration()
        );
        assert!(
            !LeverageError::NonPositiveLeverage {
                segment: 0,
                leverage: -1.0
            }
            .is_configuration()
        );
        assert!(LeverageError::InvalidDatasheet("no axle".into()).is_configuration());
        assert!(
            !LeverageError::Unsolvable {
                sweeps: 10,
                error: 1.0
            }
            .is_configuration()
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(
            LeverageError::NonConvergence {
                iterations: 1000,
                residual: 0.5
            }
            .is_recoverable()
        );
        assert!(!LeverageError::InvalidResolution(0).is_recoverable());
        assert!(!LeverageError::UnconstrainedLinkage("shock".into()).is_recoverable());
    }
}
