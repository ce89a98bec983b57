//! Three-candle pattern detectors
//!
//! Morning / Evening Star and Three White Soldiers / Three Black Crows over
//! `c2`, `c1`, `c0` (oldest to newest).

use super::helpers::{self, check_ratio, tail};
use crate::{EnrichedCandle, OHLCVExt, Pattern, PatternDetector, PatternKind, Result};

impl_with_defaults!(
    MorningStarDetector,
    EveningStarDetector,
    ThreeWhiteSoldiersDetector,
    ThreeBlackCrowsDetector,
);

// ============================================================
// STARS
// ============================================================

/// Down c2, small-bodied c1, up c0 closing above c2's body midpoint.
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
    pub max_star_body_ratio: f64,
}

impl Default for MorningStarDetector {
    fn default() -> Self {
        Self {
            max_star_body_ratio: helpers::STAR_BODY_RATIO,
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn name(&self) -> &'static str {
        "morning_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::MorningStar]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;

        (c2.is_down()
            && c1.body() < c2.body() * self.max_star_body_ratio
            && c0.is_up()
            && c0.close > c2.body_mid())
            .then(|| Pattern::of(PatternKind::MorningStar))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("max_star_body_ratio", self.max_star_body_ratio)
    }
}

/// Up c2, small-bodied c1, down c0 closing below c2's body midpoint.
#[derive(Debug, Clone, Copy)]
pub struct EveningStarDetector {
    pub max_star_body_ratio: f64,
}

impl Default for EveningStarDetector {
    fn default() -> Self {
        Self {
            max_star_body_ratio: helpers::STAR_BODY_RATIO,
        }
    }
}

impl PatternDetector for EveningStarDetector {
    fn name(&self) -> &'static str {
        "evening_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::EveningStar]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;

        (c2.is_up()
            && c1.body() < c2.body() * self.max_star_body_ratio
            && c0.is_down()
            && c0.close < c2.body_mid())
            .then(|| Pattern::of(PatternKind::EveningStar))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("max_star_body_ratio", self.max_star_body_ratio)
    }
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// Long body relative to range on the two most recent candles
#[inline]
fn strong_bodies(c1: &EnrichedCandle, c0: &EnrichedCandle, min_ratio: f64) -> bool {
    c0.body() > c0.range() * min_ratio && c1.body() > c1.range() * min_ratio
}

/// Three up candles with rising opens and closes.
#[derive(Debug, Clone, Copy)]
pub struct ThreeWhiteSoldiersDetector {
    pub min_body_ratio: f64,
}

impl Default for ThreeWhiteSoldiersDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: helpers::SOLDIER_BODY_RATIO,
        }
    }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
    fn name(&self) -> &'static str {
        "three_white_soldiers"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ThreeWhiteSoldiers]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;
        if !(c2.is_up() && c1.is_up() && c0.is_up()) {
            return None;
        }

        (c0.close > c1.close
            && c1.close > c2.close
            && c0.open > c1.open
            && c1.open > c2.open
            && strong_bodies(c1, c0, self.min_body_ratio))
            .then(|| Pattern::of(PatternKind::ThreeWhiteSoldiers))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("min_body_ratio", self.min_body_ratio)
    }
}

/// Three down candles with falling opens and closes.
#[derive(Debug, Clone, Copy)]
pub struct ThreeBlackCrowsDetector {
    pub min_body_ratio: f64,
}

impl Default for ThreeBlackCrowsDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: helpers::SOLDIER_BODY_RATIO,
        }
    }
}

impl PatternDetector for ThreeBlackCrowsDetector {
    fn name(&self) -> &'static str {
        "three_black_crows"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ThreeBlackCrows]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c2, c1, c0] = tail::<3, _>(candles)?;
        if !(c2.is_down() && c1.is_down() && c0.is_down()) {
            return None;
        }

        (c0.close < c1.close
            && c1.close < c2.close
            && c0.open < c1.open
            && c1.open < c2.open
            && strong_bodies(c1, c0, self.min_body_ratio))
            .then(|| Pattern::of(PatternKind::ThreeBlackCrows))
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("min_body_ratio", self.min_body_ratio)
    }
}
