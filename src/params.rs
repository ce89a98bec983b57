//! Tunable detector thresholds
//!
//! Detectors that implement [`ParameterizedDetector`] describe their thresholds with
//! [`ParamMeta`] (default, search range, meaning) and can be built from a name/value
//! map. This drives grid searches and settings screens.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use candlescope::prelude::*;
//!
//! for param in DojiDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let params = HashMap::from([("max_body_ratio", 0.05)]);
//! let doji = DojiDetector::with_params(&params).unwrap();
//! assert_eq!(doji.max_body_ratio, 0.05);
//! ```

use std::collections::HashMap;

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Kind of value a parameter holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Fraction in `(0, 1]`
    Ratio,
    /// Positive multiplier, may exceed 1
    Factor,
    /// Candle count
    Period,
}

/// Description of one detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Search range as `(min, max, step)`
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn ratio(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Ratio,
            default,
            range,
            description,
        }
    }

    pub const fn factor(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Factor,
            default,
            range,
            description,
        }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Period,
            default,
            range,
            description,
        }
    }

    /// Every value of the search range, `min` to `max` inclusive
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        if step <= 0.0 {
            return vec![min];
        }
        let steps = ((max - min) / step + 1e-9).floor() as usize;
        (0..=steps).map(|i| min + i as f64 * step).collect()
    }

    /// Check `value` against the search range and the parameter type
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value < min || value > max {
            return Err(AnalysisError::OutOfRange {
                field: self.name,
                value,
                min,
                max,
            });
        }
        if self.param_type == ParamType::Period && value.fract() != 0.0 {
            return Err(AnalysisError::InvalidValue("Period must be a whole number"));
        }
        Ok(())
    }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detector whose thresholds can be listed and set by name
pub trait ParameterizedDetector: Sized {
    fn param_meta() -> &'static [ParamMeta];

    /// Build from `params`; missing names fall back to their defaults.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

    /// Matches [`crate::PatternDetector::name`]
    fn detector_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Ratio from `params`, or `default` when absent
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
    Ratio::new(params.get(key).copied().unwrap_or(default))
}

/// Positive finite multiplier from `params`, or `default` when absent
pub fn get_factor(params: &HashMap<&str, f64>, key: &'static str, default: f64) -> Result<f64> {
    let value = params.get(key).copied().unwrap_or(default);
    if !value.is_finite() || value <= 0.0 {
        return Err(AnalysisError::OutOfRange {
            field: key,
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        });
    }
    Ok(value)
}

/// Period from `params`, or `default` when absent
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    if value.fract() != 0.0 || value < 0.0 {
        return Err(AnalysisError::InvalidValue("Period must be a whole number"));
    }
    Period::new(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let meta = ParamMeta::factor("spike", 2.5, (1.5, 4.0, 0.5), "Spike multiplier");
        assert_eq!(meta.param_type, ParamType::Factor);
        assert_eq!(meta.default, 2.5);
        assert_eq!(ParamMeta::period("w", 10.0, (5.0, 20.0, 5.0), "").param_type, ParamType::Period);
    }

    #[test]
    fn test_generate_grid() {
        let grid = ParamMeta::ratio("r", 0.5, (0.3, 0.7, 0.2), "").generate_grid();
        assert_eq!(grid.len(), 3);
        assert!((grid[0] - 0.3).abs() < 1e-12);
        assert!((grid[2] - 0.7).abs() < 1e-12);

        let tenths = ParamMeta::ratio("r", 0.5, (0.1, 1.0, 0.1), "").generate_grid();
        assert_eq!(tenths.len(), 10);
    }

    #[test]
    fn test_validate() {
        let ratio = ParamMeta::ratio("r", 0.5, (0.3, 0.7, 0.1), "");
        assert!(ratio.validate(0.3).is_ok());
        assert!(ratio.validate(0.7).is_ok());
        assert!(ratio.validate(0.8).is_err());

        let period = ParamMeta::period("p", 14.0, (10.0, 20.0, 2.0), "");
        assert!(period.validate(12.0).is_ok());
        assert!(period.validate(12.5).is_err());
        assert!(period.validate(8.0).is_err());
    }

    #[test]
    fn test_value_helpers() {
        let params = HashMap::from([("ratio", 0.8), ("factor", 3.0), ("period", 20.0)]);
        assert_eq!(get_ratio(&params, "ratio", 0.5).unwrap().get(), 0.8);
        assert_eq!(get_ratio(&params, "missing", 0.5).unwrap().get(), 0.5);
        assert_eq!(get_factor(&params, "factor", 1.0).unwrap(), 3.0);
        assert!(get_factor(&params, "missing", -1.0).is_err());
        assert_eq!(get_period(&params, "period", 14).unwrap().get(), 20);
        assert_eq!(get_period(&params, "missing", 14).unwrap().get(), 14);

        let bad = HashMap::from([("ratio", 1.5), ("period", 2.5)]);
        assert!(get_ratio(&bad, "ratio", 0.5).is_err());
        assert!(get_period(&bad, "period", 14).is_err());
    }
}
