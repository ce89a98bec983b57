//! Common helpers for pattern detection
//!
//! Default thresholds shared across the detector modules, tail accessors and
//! threshold validation.

use crate::{AnalysisError, Ratio, Result};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Doji: body < range * DOJI_BODY_RATIO
pub const DOJI_BODY_RATIO: f64 = 0.08;
/// Hammer family: dominant wick > body * LONG_WICK_FACTOR
pub const LONG_WICK_FACTOR: f64 = 2.0;
/// Hammer family: opposite wick < body * SHORT_WICK_FACTOR
pub const SHORT_WICK_FACTOR: f64 = 0.5;
/// Marubozu: body > range * MARUBOZU_BODY_RATIO
pub const MARUBOZU_BODY_RATIO: f64 = 0.92;
/// Marubozu: each wick < body * MARUBOZU_WICK_FACTOR
pub const MARUBOZU_WICK_FACTOR: f64 = 0.05;
/// Spinning top: body < range * SPINNING_TOP_BODY_RATIO
pub const SPINNING_TOP_BODY_RATIO: f64 = 0.25;
/// Tweezer: extremes match within range(c0) * TWEEZER_TOLERANCE_RATIO
pub const TWEEZER_TOLERANCE_RATIO: f64 = 0.05;
/// Harami: inside body < prior body * HARAMI_BODY_RATIO
pub const HARAMI_BODY_RATIO: f64 = 0.5;
/// Piercing line / dark cloud: c0 body > c1 body * PENETRATION_BODY_RATIO
pub const PENETRATION_BODY_RATIO: f64 = 0.5;
/// Morning / evening star: star body < first body * STAR_BODY_RATIO
pub const STAR_BODY_RATIO: f64 = 0.3;
/// Soldiers / crows: body > range * SOLDIER_BODY_RATIO
pub const SOLDIER_BODY_RATIO: f64 = 0.55;

// ============================================================
// TAIL ACCESS
// ============================================================

/// The last `N` elements as a fixed-size array, oldest first.
///
/// `let [c2, c1, c0] = tail::<3, _>(candles)?;`
#[inline]
pub fn tail<const N: usize, T>(items: &[T]) -> Option<&[T; N]> {
    let start = items.len().checked_sub(N)?;
    items[start..].try_into().ok()
}

/// Trailing window of at most `len` elements
#[inline]
pub fn trailing<T>(items: &[T], len: usize) -> &[T] {
    &items[items.len().saturating_sub(len)..]
}

// ============================================================
// VALIDATION
// ============================================================

/// Threshold that must be a ratio in (0, 1]
pub fn check_ratio(field: &'static str, value: f64) -> Result<()> {
    let ratio = Ratio::new(value)?;
    if ratio.get() == 0.0 {
        return Err(AnalysisError::OutOfRange {
            field,
            value,
            min: f64::EPSILON,
            max: 1.0,
        });
    }
    Ok(())
}

/// Threshold that must be a positive, finite multiplier
pub fn check_factor(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AnalysisError::OutOfRange {
            field,
            value,
            min: f64::EPSILON,
            max: f64::MAX,
        });
    }
    Ok(())
}

/// Trailing window length that must be at least `min`
pub fn check_window(field: &'static str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(AnalysisError::InvalidConfig(format!(
            "{field} must be >= {min}, got {value}"
        )));
    }
    Ok(())
}
