//! Single-candle pattern detectors
//!
//! Doji, Hammer / Hanging Man, Shooting Star / Inverted Hammer, Marubozu and
//! Spinning Top, all read from the last candle. The hammer family also looks at the
//! colors of the two candles before it to decide the label.

use std::collections::HashMap;

use super::helpers::{self, check_factor, check_ratio, tail};
use crate::{
    params::{get_factor, get_ratio, ParamMeta, ParameterizedDetector},
    EnrichedCandle, OHLCVExt, Pattern, PatternDetector, PatternKind, Result,
};

impl_with_defaults!(
    DojiDetector,
    HammerDetector,
    ShootingStarDetector,
    MarubozuDetector,
    SpinningTopDetector,
);

// ============================================================
// DOJI
// ============================================================

/// Doji: body smaller than `max_body_ratio` of the range.
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_ratio: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: helpers::DOJI_BODY_RATIO,
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &'static str {
        "doji"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Doji]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let c0 = candles.last()?;
        let range = c0.range();
        if range == 0.0 {
            return None;
        }

        (c0.body() < range * self.max_body_ratio).then(|| Pattern::of(PatternKind::Doji))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("max_body_ratio", self.max_body_ratio)
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Long lower wick, short upper wick.
///
/// After two down candles this is a Hammer (bullish), otherwise a Hanging Man
/// (bearish).
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub long_wick_factor: f64,
    pub short_wick_factor: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            long_wick_factor: helpers::LONG_WICK_FACTOR,
            short_wick_factor: helpers::SHORT_WICK_FACTOR,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &'static str {
        "hammer"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Hammer, PatternKind::HangingMan]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;
        let body = c0.body();
        if body == 0.0 {
            return None;
        }
        if c0.lower_wick() <= body * self.long_wick_factor
            || c0.upper_wick() >= body * self.short_wick_factor
        {
            return None;
        }

        let kind = if c1.is_down() && c2.is_down() {
            PatternKind::Hammer
        } else {
            PatternKind::HangingMan
        };
        Some(Pattern::of(kind))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("long_wick_factor", self.long_wick_factor)?;
        check_factor("short_wick_factor", self.short_wick_factor)
    }
}

/// Long upper wick, short lower wick.
///
/// After two up candles this is a Shooting Star (bearish), otherwise an Inverted
/// Hammer (bullish).
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub long_wick_factor: f64,
    pub short_wick_factor: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            long_wick_factor: helpers::LONG_WICK_FACTOR,
            short_wick_factor: helpers::SHORT_WICK_FACTOR,
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn name(&self) -> &'static str {
        "shooting_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ShootingStar, PatternKind::InvertedHammer]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;
        let body = c0.body();
        if body == 0.0 {
            return None;
        }
        if c0.upper_wick() <= body * self.long_wick_factor
            || c0.lower_wick() >= body * self.short_wick_factor
        {
            return None;
        }

        let kind = if c1.is_up() && c2.is_up() {
            PatternKind::ShootingStar
        } else {
            PatternKind::InvertedHammer
        };
        Some(Pattern::of(kind))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("long_wick_factor", self.long_wick_factor)?;
        check_factor("short_wick_factor", self.short_wick_factor)
    }
}

// ============================================================
// MARUBOZU
// ============================================================

/// Body fills almost the whole range with negligible wicks on both ends.
#[derive(Debug, Clone, Copy)]
pub struct MarubozuDetector {
    pub min_body_ratio: f64,
    pub max_wick_factor: f64,
}

impl Default for MarubozuDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: helpers::MARUBOZU_BODY_RATIO,
            max_wick_factor: helpers::MARUBOZU_WICK_FACTOR,
        }
    }
}

impl PatternDetector for MarubozuDetector {
    fn name(&self) -> &'static str {
        "marubozu"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishMarubozu, PatternKind::BearishMarubozu]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let c0 = candles.last()?;
        let range = c0.range();
        if range == 0.0 {
            return None;
        }
        let body = c0.body();
        let max_wick = body * self.max_wick_factor;
        if body <= range * self.min_body_ratio
            || c0.upper_wick() >= max_wick
            || c0.lower_wick() >= max_wick
        {
            return None;
        }

        let kind = if c0.is_up() {
            PatternKind::BullishMarubozu
        } else {
            PatternKind::BearishMarubozu
        };
        Some(Pattern::of(kind))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("min_body_ratio", self.min_body_ratio)?;
        check_factor("max_wick_factor", self.max_wick_factor)
    }
}

// ============================================================
// SPINNING TOP
// ============================================================

/// Small body with both wicks longer than the body.
#[derive(Debug, Clone, Copy)]
pub struct SpinningTopDetector {
    pub max_body_ratio: f64,
}

impl Default for SpinningTopDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: helpers::SPINNING_TOP_BODY_RATIO,
        }
    }
}

impl PatternDetector for SpinningTopDetector {
    fn name(&self) -> &'static str {
        "spinning_top"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::SpinningTop]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let c0 = candles.last()?;
        let range = c0.range();
        if range == 0.0 {
            return None;
        }
        let body = c0.body();

        (body < range * self.max_body_ratio && c0.upper_wick() > body && c0.lower_wick() > body)
            .then(|| Pattern::of(PatternKind::SpinningTop))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("max_body_ratio", self.max_body_ratio)
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static DOJI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_body_ratio",
    helpers::DOJI_BODY_RATIO,
    (0.04, 0.16, 0.02),
    "Largest body, as a fraction of the range, that still counts as a doji",
)];

static MARUBOZU_PARAMS: &[ParamMeta] = &[
    ParamMeta::ratio(
        "min_body_ratio",
        helpers::MARUBOZU_BODY_RATIO,
        (0.85, 0.98, 0.01),
        "Smallest body as a fraction of the range",
    ),
    ParamMeta::factor(
        "max_wick_factor",
        helpers::MARUBOZU_WICK_FACTOR,
        (0.01, 0.1, 0.01),
        "Longest allowed wick as a multiple of the body",
    ),
];

static SPINNING_TOP_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_body_ratio",
    helpers::SPINNING_TOP_BODY_RATIO,
    (0.15, 0.35, 0.05),
    "Largest body as a fraction of the range",
)];

impl ParameterizedDetector for DojiDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOJI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_body_ratio: get_ratio(params, "max_body_ratio", helpers::DOJI_BODY_RATIO)?.get(),
        })
    }

    fn detector_name() -> &'static str {
        "doji"
    }
}

impl ParameterizedDetector for MarubozuDetector {
    fn param_meta() -> &'static [ParamMeta] {
        MARUBOZU_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            min_body_ratio: get_ratio(params, "min_body_ratio", helpers::MARUBOZU_BODY_RATIO)?
                .get(),
            max_wick_factor: get_factor(
                params,
                "max_wick_factor",
                helpers::MARUBOZU_WICK_FACTOR,
            )?,
        })
    }

    fn detector_name() -> &'static str {
        "marubozu"
    }
}

impl ParameterizedDetector for SpinningTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SPINNING_TOP_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_body_ratio: get_ratio(
                params,
                "max_body_ratio",
                helpers::SPINNING_TOP_BODY_RATIO,
            )?
            .get(),
        })
    }

    fn detector_name() -> &'static str {
        "spinning_top"
    }
}
