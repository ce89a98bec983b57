//! Two-candle pattern detectors
//!
//! Engulfing, Tweezer Top/Bottom, Harami, Piercing Line and Dark Cloud Cover over
//! `c1` (previous) and `c0` (last).

use super::helpers::{self, check_factor, check_ratio, tail};
use crate::{EnrichedCandle, OHLCVExt, Pattern, PatternDetector, PatternKind, Result};

impl_with_defaults!(
    EngulfingDetector,
    TweezerDetector,
    HaramiDetector,
    PiercingLineDetector,
    DarkCloudCoverDetector,
);

// ============================================================
// ENGULFING
// ============================================================

/// c0 body strictly contains the opposite-colored c1 body and is larger.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn name(&self) -> &'static str {
        "engulfing"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishEngulfing, PatternKind::BearishEngulfing]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c1, c0] = tail::<2, _>(candles)?;
        let prev_body = c1.body();
        if prev_body == 0.0 || c0.body() <= prev_body {
            return None;
        }

        if c1.is_down() && c0.is_up() && c0.open < c1.close && c0.close > c1.open {
            return Some(Pattern::of(PatternKind::BullishEngulfing));
        }
        if c1.is_up() && c0.is_down() && c0.open > c1.close && c0.close < c1.open {
            return Some(Pattern::of(PatternKind::BearishEngulfing));
        }
        None
    }
}

// ============================================================
// TWEEZER
// ============================================================

/// Opposite colors with matching lows (bottom) or highs (top).
///
/// Matching means the difference is below `tolerance_ratio` of c0's range.
#[derive(Debug, Clone, Copy)]
pub struct TweezerDetector {
    pub tolerance_ratio: f64,
}

impl Default for TweezerDetector {
    fn default() -> Self {
        Self {
            tolerance_ratio: helpers::TWEEZER_TOLERANCE_RATIO,
        }
    }
}

impl PatternDetector for TweezerDetector {
    fn name(&self) -> &'static str {
        "tweezer"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::TweezerBottom, PatternKind::TweezerTop]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c1, c0] = tail::<2, _>(candles)?;
        let tolerance = c0.range() * self.tolerance_ratio;

        if c1.is_down() && c0.is_up() && (c0.low - c1.low).abs() < tolerance {
            return Some(Pattern::of(PatternKind::TweezerBottom));
        }
        if c1.is_up() && c0.is_down() && (c0.high - c1.high).abs() < tolerance {
            return Some(Pattern::of(PatternKind::TweezerTop));
        }
        None
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("tolerance_ratio", self.tolerance_ratio)
    }
}

// ============================================================
// HARAMI
// ============================================================

/// Small opposite-colored c0 body strictly inside the c1 body.
#[derive(Debug, Clone, Copy)]
pub struct HaramiDetector {
    pub max_body_ratio: f64,
}

impl Default for HaramiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: helpers::HARAMI_BODY_RATIO,
        }
    }
}

impl PatternDetector for HaramiDetector {
    fn name(&self) -> &'static str {
        "harami"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishHarami, PatternKind::BearishHarami]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c1, c0] = tail::<2, _>(candles)?;
        let prev_body = c1.body();
        if prev_body == 0.0 || c0.body() >= prev_body * self.max_body_ratio {
            return None;
        }
        if c0.body_top() >= c1.body_top() || c0.body_bottom() <= c1.body_bottom() {
            return None;
        }

        match (c1.is_up(), c0.is_up()) {
            (false, true) => Some(Pattern::of(PatternKind::BullishHarami)),
            (true, false) => Some(Pattern::of(PatternKind::BearishHarami)),
            _ => None,
        }
    }

    fn validate_config(&self) -> Result<()> {
        check_ratio("max_body_ratio", self.max_body_ratio)
    }
}

// ============================================================
// PIERCING LINE / DARK CLOUD COVER
// ============================================================

/// Up c0 opens below a down c1's close and closes above c1's body midpoint.
#[derive(Debug, Clone, Copy)]
pub struct PiercingLineDetector {
    pub min_body_ratio: f64,
}

impl Default for PiercingLineDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: helpers::PENETRATION_BODY_RATIO,
        }
    }
}

impl PatternDetector for PiercingLineDetector {
    fn name(&self) -> &'static str {
        "piercing_line"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::PiercingLine]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c1, c0] = tail::<2, _>(candles)?;
        if c0.is_down() || c1.is_up() {
            return None;
        }

        (c0.open < c1.close
            && c0.close > c1.body_mid()
            && c0.body() > c1.body() * self.min_body_ratio)
            .then(|| Pattern::of(PatternKind::PiercingLine))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("min_body_ratio", self.min_body_ratio)
    }
}

/// Down c0 opens above an up c1's close and closes below c1's body midpoint.
#[derive(Debug, Clone, Copy)]
pub struct DarkCloudCoverDetector {
    pub min_body_ratio: f64,
}

impl Default for DarkCloudCoverDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: helpers::PENETRATION_BODY_RATIO,
        }
    }
}

impl PatternDetector for DarkCloudCoverDetector {
    fn name(&self) -> &'static str {
        "dark_cloud_cover"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DarkCloudCover]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let [c1, c0] = tail::<2, _>(candles)?;
        if c0.is_up() || c1.is_down() {
            return None;
        }

        (c0.open > c1.close
            && c0.close < c1.body_mid()
            && c0.body() > c1.body() * self.min_body_ratio)
            .then(|| Pattern::of(PatternKind::DarkCloudCover))
    }

    fn validate_config(&self) -> Result<()> {
        check_factor("min_body_ratio", self.min_body_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Candle, Direction};

    fn candle(o: f64, h: f64, l: f64, c: f64) -> EnrichedCandle {
        EnrichedCandle::from(Candle::new(0, o, h, l, c, 1000.0))
    }

    #[test]
    fn test_bullish_engulfing() {
        let prev = candle(101.0, 101.5, 99.5, 100.0);
        let curr = candle(99.5, 102.5, 99.0, 102.0);
        let p = EngulfingDetector.detect(&[prev, curr]).unwrap();
        assert_eq!(p.kind, PatternKind::BullishEngulfing);
        assert_eq!(p.direction, Direction::Bullish);
        assert_eq!(p.confidence, 83);
    }

    #[test]
    fn test_bearish_engulfing() {
        let prev = candle(100.0, 101.5, 99.5, 101.0);
        let curr = candle(101.5, 102.0, 98.5, 99.0);
        let p = EngulfingDetector.detect(&[prev, curr]).unwrap();
        assert_eq!(p.kind, PatternKind::BearishEngulfing);
    }

    #[test]
    fn test_engulfing_requires_strict_containment() {
        // c0 opens exactly at c1 close
        let prev = candle(101.0, 101.5, 99.5, 100.0);
        let curr = candle(100.0, 102.5, 99.0, 102.0);
        assert!(EngulfingDetector.detect(&[prev, curr]).is_none());
    }

    #[test]
    fn test_tweezer_bottom_and_top() {
        let d = TweezerDetector::default();
        let bottom = d
            .detect(&[candle(102.0, 102.5, 98.0, 99.0), candle(99.0, 103.0, 98.05, 102.0)])
            .unwrap();
        assert_eq!(bottom.kind, PatternKind::TweezerBottom);

        let top = d
            .detect(&[candle(99.0, 103.0, 98.5, 102.0), candle(102.0, 102.95, 98.0, 99.0)])
            .unwrap();
        assert_eq!(top.kind, PatternKind::TweezerTop);

        // same color
        assert!(d
            .detect(&[candle(99.0, 103.0, 98.0, 102.0), candle(99.0, 103.0, 98.0, 102.0)])
            .is_none());
    }

    #[test]
    fn test_harami() {
        let d = HaramiDetector::default();
        let bull = d
            .detect(&[candle(110.0, 111.0, 99.0, 100.0), candle(104.0, 106.0, 103.0, 105.0)])
            .unwrap();
        assert_eq!(bull.kind, PatternKind::BullishHarami);

        let bear = d
            .detect(&[candle(100.0, 111.0, 99.0, 110.0), candle(105.0, 106.0, 103.0, 104.0)])
            .unwrap();
        assert_eq!(bear.kind, PatternKind::BearishHarami);

        // inside but same color
        assert!(d
            .detect(&[candle(100.0, 111.0, 99.0, 110.0), candle(104.0, 106.0, 103.0, 105.0)])
            .is_none());
    }

    #[test]
    fn test_piercing_line() {
        let d = PiercingLineDetector::default();
        let prev = candle(110.0, 110.5, 99.5, 100.0);
        let curr = candle(99.0, 107.0, 98.5, 106.0);
        assert_eq!(
            d.detect(&[prev.clone(), curr]).unwrap().kind,
            PatternKind::PiercingLine
        );
        // closes below the midpoint
        let weak = candle(99.0, 104.0, 98.5, 104.0);
        assert!(d.detect(&[prev, weak]).is_none());
    }

    #[test]
    fn test_dark_cloud_cover() {
        let d = DarkCloudCoverDetector::default();
        let prev = candle(100.0, 110.5, 99.5, 110.0);
        let curr = candle(111.0, 111.5, 103.0, 104.0);
        assert_eq!(
            d.detect(&[prev, curr]).unwrap().kind,
            PatternKind::DarkCloudCover
        );
    }
}
