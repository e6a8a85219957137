//! Unit conversions used throughout the leverage math.
//!
//! Travel and stroke are entered in millimetres, but the curve math runs in
//! inches and spring rates are quoted in lbf/in, so a handful of constants
//! cover every conversion the crate performs.

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Newtons per pound-force, rounded the way spring rates are usually quoted.
pub const NEWTONS_PER_LBF: f64 = 4.448;

/// Converts millimetres to inches.
#[inline]
pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Converts inches to millimetres.
#[inline]
pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

/// Converts pound-force to newtons.
#[inline]
pub fn lbf_to_newtons(lbf: f64) -> f64 {
    lbf * NEWTONS_PER_LBF
}

/// Converts a spring rate in lbf/in to N/mm.
///
/// ```rust
/// use leverage::units::spring_rate_n_per_mm;
///
/// let k = spring_rate_n_per_mm(400.0);
/// assert!((k - 70.047).abs() < 1e-3);
/// ```
#[inline]
pub fn spring_rate_n_per_mm(lbf_per_inch: f64) -> f64 {
    lbf_to_newtons(lbf_per_inch) / MM_PER_INCH
}
