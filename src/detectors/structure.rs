//! Whole-window chart structure detectors
//!
//! These look at a trailing window of the sequence instead of the last few candle
//! shapes: HH/HL trend structure, tight consolidation, volume climax and Bollinger
//! squeeze.

use std::collections::HashMap;

use super::helpers::{check_factor, check_ratio, check_window, tail, trailing};
use crate::{
    params::{get_factor, get_period, get_ratio, ParamMeta, ParameterizedDetector},
    Direction, EnrichedCandle, OHLCVExt, Pattern, PatternDetector, PatternKind, Result,
};

impl_with_defaults!(
    TrendStructureDetector,
    ConsolidationDetector,
    VolumeClimaxDetector,
    BollingerSqueezeDetector,
);

// ============================================================
// TREND STRUCTURE
// ============================================================

/// Candles inspected by [`TrendStructureDetector`]
pub const TREND_STRUCTURE_WINDOW: usize = 12;

/// Swing points sampled at these offsets inside the window
const SWING_OFFSETS: [usize; 3] = [1, 6, 11];

/// Higher highs and higher lows (or lower highs and lower lows) across the last 12
/// candles, sampled at window offsets 1, 6 and 11.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendStructureDetector;

impl PatternDetector for TrendStructureDetector {
    fn name(&self) -> &'static str {
        "trend_structure"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[
            PatternKind::HigherHighsHigherLows,
            PatternKind::LowerHighsLowerLows,
        ]
    }

    fn min_bars(&self) -> usize {
        TREND_STRUCTURE_WINDOW
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let window = tail::<TREND_STRUCTURE_WINDOW, _>(candles)?;
        let [a, b, c] = SWING_OFFSETS.map(|i| &window[i]);

        if c.high > b.high && b.high > a.high && c.low > b.low && b.low > a.low {
            return Some(Pattern::of(PatternKind::HigherHighsHigherLows));
        }
        if c.high < b.high && b.high < a.high && c.low < b.low && b.low < a.low {
            return Some(Pattern::of(PatternKind::LowerHighsLowerLows));
        }
        None
    }
}

// ============================================================
// CONSOLIDATION
// ============================================================

/// Whole trailing range narrower than `max_range_ratio` of the last close.
#[derive(Debug, Clone, Copy)]
pub struct ConsolidationDetector {
    pub window: usize,
    pub max_range_ratio: f64,
}

impl Default for ConsolidationDetector {
    fn default() -> Self {
        Self {
            window: 10,
            max_range_ratio: 0.012,
        }
    }
}

impl PatternDetector for ConsolidationDetector {
    fn name(&self) -> &'static str {
        "consolidation"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::TightConsolidation]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let last_close = candles.last()?.close;
        if last_close == 0.0 {
            return None;
        }
        let window = trailing(candles, self.window);
        if window.is_empty() {
            return None;
        }
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        ((high - low) / last_close < self.max_range_ratio)
            .then(|| Pattern::of(PatternKind::TightConsolidation))
    }

    fn validate_config(&self) -> Result<()> {
        check_window("window", self.window, 1)?;
        check_ratio("max_range_ratio", self.max_range_ratio)
    }
}

// ============================================================
// VOLUME CLIMAX
// ============================================================

/// Last volume above `spike_factor` times the trailing mean volume (the mean
/// includes the last candle). Direction follows the color of the last candle.
#[derive(Debug, Clone, Copy)]
pub struct VolumeClimaxDetector {
    pub window: usize,
    pub spike_factor: f64,
}

impl Default for VolumeClimaxDetector {
    fn default() -> Self {
        Self {
            window: 20,
            spike_factor: 2.5,
        }
    }
}

impl PatternDetector for VolumeClimaxDetector {
    fn name(&self) -> &'static str {
        "volume_climax"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::VolumeClimax]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let last = candles.last()?;
        let window = trailing(candles, self.window);
        if window.is_empty() {
            return None;
        }
        let mean = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;
        if mean <= 0.0 || last.volume <= mean * self.spike_factor {
            return None;
        }

        let direction = if last.is_up() {
            Direction::Bullish
        } else {
            Direction::Bearish
        };
        Some(Pattern::with_direction(PatternKind::VolumeClimax, direction))
    }

    fn validate_config(&self) -> Result<()> {
        check_window("window", self.window, 1)?;
        check_factor("spike_factor", self.spike_factor)
    }
}

// ============================================================
// BOLLINGER SQUEEZE
// ============================================================

/// Last band width below `squeeze_ratio` of the mean width over the trailing
/// window (entries still in warm-up are skipped).
#[derive(Debug, Clone, Copy)]
pub struct BollingerSqueezeDetector {
    pub window: usize,
    pub squeeze_ratio: f64,
}

impl Default for BollingerSqueezeDetector {
    fn default() -> Self {
        Self {
            window: 20,
            squeeze_ratio: 0.5,
        }
    }
}

impl PatternDetector for BollingerSqueezeDetector {
    fn name(&self) -> &'static str {
        "bollinger_squeeze"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BollingerSqueeze]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
        let last_width = candles.last()?.bb_width?;
        let (sum, count) = trailing(candles, self.window)
            .iter()
            .filter_map(|c| c.bb_width)
            .fold((0.0, 0usize), |(sum, count), w| (sum + w, count + 1));
        let mean = sum / count as f64;

        (last_width < mean * self.squeeze_ratio)
            .then(|| Pattern::of(PatternKind::BollingerSqueeze))
    }

    fn validate_config(&self) -> Result<()> {
        check_window("window", self.window, 1)?;
        check_ratio("squeeze_ratio", self.squeeze_ratio)
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static CONSOLIDATION_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 10.0, (5.0, 30.0, 5.0), "Candles in the range check"),
    ParamMeta::ratio(
        "max_range_ratio",
        0.012,
        (0.004, 0.03, 0.002),
        "Widest high-low range as a fraction of the last close",
    ),
];

static VOLUME_CLIMAX_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 20.0, (10.0, 50.0, 5.0), "Candles in the volume mean"),
    ParamMeta::factor(
        "spike_factor",
        2.5,
        (1.5, 5.0, 0.5),
        "Last volume must exceed the mean by this multiple",
    ),
];

static BOLLINGER_SQUEEZE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 20.0, (10.0, 50.0, 5.0), "Candles in the width mean"),
    ParamMeta::ratio(
        "squeeze_ratio",
        0.5,
        (0.3, 0.8, 0.05),
        "Last width must be below this fraction of the mean width",
    ),
];

impl ParameterizedDetector for ConsolidationDetector {
    fn param_meta() -> &'static [ParamMeta] {
        CONSOLIDATION_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", 10)?.get(),
            max_range_ratio: get_ratio(params, "max_range_ratio", 0.012)?.get(),
        })
    }

    fn detector_name() -> &'static str {
        "consolidation"
    }
}

impl ParameterizedDetector for VolumeClimaxDetector {
    fn param_meta() -> &'static [ParamMeta] {
        VOLUME_CLIMAX_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", 20)?.get(),
            spike_factor: get_factor(params, "spike_factor", 2.5)?,
        })
    }

    fn detector_name() -> &'static str {
        "volume_climax"
    }
}

impl ParameterizedDetector for BollingerSqueezeDetector {
    fn param_meta() -> &'static [ParamMeta] {
        BOLLINGER_SQUEEZE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", 20)?.get(),
            squeeze_ratio: get_ratio(params, "squeeze_ratio", 0.5)?.get(),
        })
    }

    fn detector_name() -> &'static str {
        "bollinger_squeeze"
    }
}
