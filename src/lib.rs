//! # candlescope
//!
//! Candle enrichment, candlestick/chart pattern scanning and composite trend reading
//! for OHLCV series.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlescope::prelude::*;
//!
//! // Raw candles from any data source, oldest first
//! let raw: Vec<Candle> = (0..120)
//!     .map(|i| {
//!         let base = 100.0 + i as f64 * 0.5;
//!         Candle::new(i * 60_000, base, base + 1.0, base - 1.0, base + 0.4, 1_000.0)
//!     })
//!     .collect();
//!
//! // Indicators, patterns and the trend verdict in one pass
//! let analysis = analyze(&raw);
//! assert_eq!(analysis.candles.len(), raw.len());
//! assert!(analysis.patterns.len() <= 8);
//! assert!(analysis.verdict.trend.is_bullish());
//! ```

use serde::{Deserialize, Serialize};

pub mod detectors;
pub mod indicators;
pub mod params;
pub mod processor;
pub mod trend;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::*,
        // Indicators
        indicators::{AverageLine, Bands, Directional, MacdPoint},
        // Parameters
        params::{get_factor, get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Candle processing
        processor::{
            apply_tick, generate_mock_history, generate_mock_history_with, process_full,
            tick_update,
        },
        // Trend reading
        trend::{classify_trend, Signal, SignalSource, Trend, TrendConfig, TrendReader, TrendVerdict},
        // Pipeline
        analyze,
        analyze_parallel,
        detect_patterns,
        Analysis,
        AnalysisError,
        // Scanner
        BuiltinDetector,
        // Types
        Candle,
        CandleColor,
        Direction,
        EnrichedCandle,
        InstrumentAnalysis,
        OHLCVExt,
        Pattern,
        PatternDetector,
        PatternKind,
        PatternScanner,
        Period,
        Pipeline,
        Ratio,
        Result,
        ScannerBuilder,
        ScannerConfig,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while validating configuration.
///
/// The computation core never returns these: missing history shows up as `None`
/// indicator fields, an empty pattern list or a `Trend::Loading` verdict.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Lookback length in candles (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Candle geometry derived from OHLC.
///
/// Nothing here assumes `high >= max(open, close)`; inconsistent candles simply
/// yield negative wicks.
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    /// Midpoint of the real body
    #[inline]
    fn body_mid(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.body_top()
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.body_bottom() - self.low()
    }

    /// Flat candles (close == open) count as up.
    #[inline]
    fn is_up(&self) -> bool {
        self.close() >= self.open()
    }

    #[inline]
    fn is_down(&self) -> bool {
        !self.is_up()
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// CANDLES
// ============================================================

/// One raw OHLCV time bucket. `time` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Display color of a candle body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleColor {
    #[default]
    Bull,
    Bear,
}

impl CandleColor {
    pub fn hex(self) -> &'static str {
        match self {
            CandleColor::Bull => "#10b981",
            CandleColor::Bear => "#f43f5e",
        }
    }
}

/// A candle annotated with every indicator the pipeline knows about plus the
/// display fields (`is_up`, `color`, `body`, `wick`).
///
/// Indicator fields are `None` during their warm-up period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCandle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    pub ema9: Option<f64>,
    pub ema12: Option<f64>,
    pub ema21: Option<f64>,
    pub ema26: Option<f64>,
    pub sma50: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub adx: Option<f64>,
    pub di_plus: Option<f64>,
    pub di_minus: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub obv: Option<f64>,

    pub is_up: bool,
    pub color: CandleColor,
    /// `[min(open, close), max(open, close)]`
    pub body: [f64; 2],
    /// `[low, high]`
    pub wick: [f64; 2],
}

impl EnrichedCandle {
    /// Recompute `is_up`, `color`, `body` and `wick` from the current OHLC.
    pub fn refresh_display(&mut self) {
        self.is_up = OHLCVExt::is_up(self);
        self.color = if self.is_up {
            CandleColor::Bull
        } else {
            CandleColor::Bear
        };
        self.body = [self.body_bottom(), self.body_top()];
        self.wick = [self.low, self.high];
    }

    /// The raw OHLCV part of this candle
    pub fn candle(&self) -> Candle {
        Candle::new(
            self.time,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

impl From<Candle> for EnrichedCandle {
    fn from(c: Candle) -> Self {
        let mut enriched = Self {
            time: c.time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            ..Self::default()
        };
        enriched.refresh_display();
        enriched
    }
}

impl From<&Candle> for EnrichedCandle {
    fn from(c: &Candle) -> Self {
        Self::from(*c)
    }
}

impl OHLCV for EnrichedCandle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// PATTERNS
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Every pattern the builtin battery can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Doji,
    Hammer,
    HangingMan,
    ShootingStar,
    InvertedHammer,
    BullishMarubozu,
    BearishMarubozu,
    SpinningTop,
    BullishEngulfing,
    BearishEngulfing,
    TweezerBottom,
    TweezerTop,
    BullishHarami,
    BearishHarami,
    PiercingLine,
    DarkCloudCover,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    HigherHighsHigherLows,
    LowerHighsLowerLows,
    TightConsolidation,
    VolumeClimax,
    BollingerSqueeze,
}

impl PatternKind {
    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Doji => "Doji",
            PatternKind::Hammer => "Hammer",
            PatternKind::HangingMan => "Hanging Man",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::InvertedHammer => "Inverted Hammer",
            PatternKind::BullishMarubozu => "Bullish Marubozu",
            PatternKind::BearishMarubozu => "Bearish Marubozu",
            PatternKind::SpinningTop => "Spinning Top",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::TweezerBottom => "Tweezer Bottom",
            PatternKind::TweezerTop => "Tweezer Top",
            PatternKind::BullishHarami => "Bullish Harami",
            PatternKind::BearishHarami => "Bearish Harami",
            PatternKind::PiercingLine => "Piercing Line",
            PatternKind::DarkCloudCover => "Dark Cloud Cover",
            PatternKind::MorningStar => "Morning Star",
            PatternKind::EveningStar => "Evening Star",
            PatternKind::ThreeWhiteSoldiers => "Three White Soldiers",
            PatternKind::ThreeBlackCrows => "Three Black Crows",
            PatternKind::HigherHighsHigherLows => "HH + HL Uptrend",
            PatternKind::LowerHighsLowerLows => "LH + LL Downtrend",
            PatternKind::TightConsolidation => "Tight Consolidation",
            PatternKind::VolumeClimax => "Volume Climax",
            PatternKind::BollingerSqueeze => "Bollinger Squeeze",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PatternKind::Doji => "Market indecision, watch for follow-through",
            PatternKind::Hammer => "Bullish reversal: buyers rejected lower prices",
            PatternKind::HangingMan => "Bearish warning at potential resistance",
            PatternKind::ShootingStar => "Bearish reversal: sellers rejected higher prices",
            PatternKind::InvertedHammer => "Potential bullish reversal, needs follow-up",
            PatternKind::BullishMarubozu => "Full buyer control, strong momentum candle",
            PatternKind::BearishMarubozu => "Full seller control, strong bearish momentum",
            PatternKind::SpinningTop => "Balanced pressure, neither side in control",
            PatternKind::BullishEngulfing => "Buyers overwhelm sellers, strong reversal signal",
            PatternKind::BearishEngulfing => "Sellers overwhelm buyers, strong reversal signal",
            PatternKind::TweezerBottom => "Double support test rejected, buyers stepping in",
            PatternKind::TweezerTop => "Double resistance test rejected, sellers stepping in",
            PatternKind::BullishHarami => "Inside candle after bearish move, slowing momentum",
            PatternKind::BearishHarami => "Inside candle after bullish move, slowing momentum",
            PatternKind::PiercingLine => "Bullish counter-attack: buyers pierce bearish candle",
            PatternKind::DarkCloudCover => "Bearish counter-attack: sellers pierce bullish candle",
            PatternKind::MorningStar => "3-candle reversal, strong bottom confirmation",
            PatternKind::EveningStar => "3-candle reversal, strong top confirmation",
            PatternKind::ThreeWhiteSoldiers => "Sustained bullish momentum across 3 sessions",
            PatternKind::ThreeBlackCrows => "Sustained bearish pressure across 3 sessions",
            PatternKind::HigherHighsHigherLows => {
                "Higher highs and higher lows confirm active uptrend"
            }
            PatternKind::LowerHighsLowerLows => "Lower highs and lower lows confirm active downtrend",
            PatternKind::TightConsolidation => {
                "Narrow range compression, expect volatility breakout"
            }
            PatternKind::VolumeClimax => "Extreme volume spike: potential exhaustion or breakout",
            PatternKind::BollingerSqueeze => "Volatility contracting, directional move approaching",
        }
    }

    /// Fixed confidence score (0..=100) reported for this pattern.
    pub fn confidence(self) -> u8 {
        match self {
            PatternKind::SpinningTop => 60,
            PatternKind::InvertedHammer => 65,
            PatternKind::BullishHarami | PatternKind::BearishHarami => 67,
            PatternKind::Doji => 68,
            PatternKind::HangingMan => 70,
            PatternKind::PiercingLine
            | PatternKind::DarkCloudCover
            | PatternKind::TightConsolidation => 72,
            PatternKind::ShootingStar | PatternKind::TweezerBottom | PatternKind::TweezerTop => 74,
            PatternKind::Hammer => 76,
            PatternKind::BollingerSqueeze => 77,
            PatternKind::BullishMarubozu | PatternKind::BearishMarubozu => 79,
            PatternKind::VolumeClimax => 81,
            PatternKind::BullishEngulfing | PatternKind::BearishEngulfing => 83,
            PatternKind::MorningStar | PatternKind::EveningStar => 86,
            PatternKind::ThreeWhiteSoldiers | PatternKind::ThreeBlackCrows => 89,
            PatternKind::HigherHighsHigherLows | PatternKind::LowerHighsLowerLows => 91,
        }
    }

    /// Direction this pattern always reports.
    ///
    /// `None` for patterns whose direction depends on the candle that formed them
    /// (a volume climax takes the color of the climax candle).
    pub fn typical_direction(self) -> Option<Direction> {
        match self {
            PatternKind::Hammer
            | PatternKind::InvertedHammer
            | PatternKind::BullishMarubozu
            | PatternKind::BullishEngulfing
            | PatternKind::TweezerBottom
            | PatternKind::BullishHarami
            | PatternKind::PiercingLine
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::HigherHighsHigherLows => Some(Direction::Bullish),
            PatternKind::HangingMan
            | PatternKind::ShootingStar
            | PatternKind::BearishMarubozu
            | PatternKind::BearishEngulfing
            | PatternKind::TweezerTop
            | PatternKind::BearishHarami
            | PatternKind::DarkCloudCover
            | PatternKind::EveningStar
            | PatternKind::ThreeBlackCrows
            | PatternKind::LowerHighsLowerLows => Some(Direction::Bearish),
            PatternKind::Doji
            | PatternKind::SpinningTop
            | PatternKind::TightConsolidation
            | PatternKind::BollingerSqueeze => Some(Direction::Neutral),
            PatternKind::VolumeClimax => None,
        }
    }

    /// Whole-window chart structure rather than a candle formation
    pub fn is_chart(self) -> bool {
        matches!(
            self,
            PatternKind::HigherHighsHigherLows
                | PatternKind::LowerHighsLowerLows
                | PatternKind::TightConsolidation
                | PatternKind::VolumeClimax
                | PatternKind::BollingerSqueeze
        )
    }
}

/// One detected pattern. Recomputed on every scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub kind: PatternKind,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub description: &'static str,
    pub confidence: u8,
    pub is_chart: bool,
}

impl Pattern {
    /// Pattern of a kind with a fixed direction
    pub fn of(kind: PatternKind) -> Self {
        Self::with_direction(kind, kind.typical_direction().unwrap_or(Direction::Neutral))
    }

    pub fn with_direction(kind: PatternKind, direction: Direction) -> Self {
        Self {
            kind,
            name: kind.name(),
            direction,
            description: kind.description(),
            confidence: kind.confidence(),
            is_chart: kind.is_chart(),
        }
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Minimum candles before any pattern is reported
pub const MIN_SCAN_CANDLES: usize = 5;

/// A detector looks at the tail of an enriched sequence and reports at most one
/// pattern. Object safe, so custom detectors can be boxed next to the builtins.
pub trait PatternDetector: Send + Sync {
    /// Detector name, used in logs
    fn name(&self) -> &'static str;

    /// Every kind this detector can report
    fn kinds(&self) -> &'static [PatternKind];

    fn min_bars(&self) -> usize;

    fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch.
        ///
        /// Variant order is the evaluation order, and the tie-break order for
        /// patterns of equal confidence.
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect(&self, candles: &[EnrichedCandle]) -> Option<Pattern> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, candles)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn kinds(&self) -> &'static [PatternKind] {
                match self {
                    $(Self::$variant(d) => PatternDetector::kinds(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single candle
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Marubozu(MarubozuDetector),
    SpinningTop(SpinningTopDetector),

    // Two candle
    Engulfing(EngulfingDetector),
    Tweezer(TweezerDetector),
    Harami(HaramiDetector),
    PiercingLine(PiercingLineDetector),
    DarkCloudCover(DarkCloudCoverDetector),

    // Three candle
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),

    // Chart structure
    TrendStructure(TrendStructureDetector),
    Consolidation(ConsolidationDetector),
    VolumeClimax(VolumeClimaxDetector),
    BollingerSqueeze(BollingerSqueezeDetector),
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl BuiltinDetector {
    pub fn single_bar_defaults() -> [BuiltinDetector; 5] {
        builtin_defaults![Doji, Hammer, ShootingStar, Marubozu, SpinningTop]
    }

    pub fn two_bar_defaults() -> [BuiltinDetector; 5] {
        builtin_defaults![Engulfing, Tweezer, Harami, PiercingLine, DarkCloudCover]
    }

    pub fn three_bar_defaults() -> [BuiltinDetector; 4] {
        builtin_defaults![MorningStar, EveningStar, ThreeWhiteSoldiers, ThreeBlackCrows]
    }

    pub fn chart_defaults() -> [BuiltinDetector; 4] {
        builtin_defaults![TrendStructure, Consolidation, VolumeClimax, BollingerSqueeze]
    }

    /// The full battery in evaluation order
    pub fn all_defaults() -> Vec<BuiltinDetector> {
        let mut all = Vec::with_capacity(18);
        all.extend(Self::single_bar_defaults());
        all.extend(Self::two_bar_defaults());
        all.extend(Self::three_bar_defaults());
        all.extend(Self::chart_defaults());
        all
    }
}

// ============================================================
// PATTERN SCANNER
// ============================================================

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Results are truncated to this many entries after sorting
    pub max_results: usize,
    pub min_confidence: Option<u8>,
    pub pattern_filter: Option<Vec<PatternKind>>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_results: 8,
            min_confidence: None,
            pattern_filter: None,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_results must be > 0".to_string(),
            ));
        }
        if let Some(min) = self.min_confidence {
            if min > 100 {
                return Err(AnalysisError::OutOfRange {
                    field: "min_confidence",
                    value: f64::from(min),
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        Ok(())
    }
}

/// Runs the detector battery over the tail of an enriched sequence.
pub struct PatternScanner {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn PatternDetector>>,
    config: ScannerConfig,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self {
            builtin: BuiltinDetector::all_defaults(),
            custom: Vec::new(),
            config: ScannerConfig::default(),
        }
    }
}

fn traced(detector: &str, found: Option<Pattern>) -> Option<Pattern> {
    if let Some(p) = &found {
        log::trace!("{detector} matched {} ({})", p.name, p.confidence);
    }
    found
}

impl PatternScanner {
    /// Detect patterns at the end of `candles`.
    ///
    /// Returns an empty list for fewer than five candles. Otherwise every detector
    /// runs once, matches are sorted by confidence (highest first, equal scores in
    /// evaluation order) and capped at `max_results`.
    pub fn scan(&self, candles: &[EnrichedCandle]) -> Vec<Pattern> {
        if candles.len() < MIN_SCAN_CANDLES {
            return Vec::new();
        }

        let builtin = self
            .builtin
            .iter()
            .filter(|d| candles.len() >= d.min_bars())
            .filter_map(|d| traced(d.name(), d.detect(candles)));
        let custom = self
            .custom
            .iter()
            .filter(|d| candles.len() >= d.min_bars())
            .filter_map(|d| traced(d.name(), d.detect(candles)));

        let mut found: Vec<Pattern> = builtin
            .chain(custom)
            .filter(|p| self.should_include(p))
            .collect();

        // stable: equal confidence keeps evaluation order
        found.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        found.truncate(self.config.max_results);

        log::debug!(
            "pattern scan over {} candles: {} match(es)",
            candles.len(),
            found.len()
        );
        found
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Number of registered detectors (builtin + custom)
    pub fn detector_count(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    fn should_include(&self, p: &Pattern) -> bool {
        if let Some(min) = self.config.min_confidence {
            if p.confidence < min {
                return false;
            }
        }
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&p.kind) {
                return false;
            }
        }
        true
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        for d in &self.builtin {
            d.validate_config()?;
        }
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

/// Scan with the full default battery
pub fn detect_patterns(candles: &[EnrichedCandle]) -> Vec<Pattern> {
    PatternScanner::default().scan(candles)
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternScanner instances
#[derive(Default)]
pub struct ScannerBuilder {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn PatternDetector>>,
    config: ScannerConfig,
}

impl ScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the whole builtin battery with default thresholds
    pub fn with_all_defaults(self) -> Self {
        self.with_candle_defaults().with_chart_defaults()
    }

    /// Single, two and three candle formations
    pub fn with_candle_defaults(self) -> Self {
        self.with_single_bar_defaults()
            .with_two_bar_defaults()
            .with_three_bar_defaults()
    }

    pub fn with_single_bar_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinDetector::single_bar_defaults());
        self
    }

    pub fn with_two_bar_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinDetector::two_bar_defaults());
        self
    }

    pub fn with_three_bar_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinDetector::three_bar_defaults());
        self
    }

    /// Whole-window structure detectors
    pub fn with_chart_defaults(mut self) -> Self {
        self.builtin.extend(BuiltinDetector::chart_defaults());
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Add a custom detector; custom detectors run after every builtin
    pub fn add_custom<D: PatternDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn min_confidence(mut self, confidence: u8) -> Self {
        self.config.min_confidence = Some(confidence);
        self
    }

    /// Report only these pattern kinds. Builtin detectors that cannot produce any
    /// of them are dropped at build time.
    pub fn only_patterns(mut self, kinds: impl IntoIterator<Item = PatternKind>) -> Self {
        self.config.pattern_filter = Some(kinds.into_iter().collect());
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PatternScanner> {
        let mut builtin = self.builtin;
        if let Some(ref filter) = self.config.pattern_filter {
            builtin.retain(|d| d.kinds().iter().any(|k| filter.contains(k)));
        }
        let scanner = PatternScanner {
            builtin,
            custom: self.custom,
            config: self.config,
        };
        scanner.validate()?;
        Ok(scanner)
    }
}

// ============================================================
// PIPELINE
// ============================================================

use rayon::prelude::*;
use trend::{TrendReader, TrendVerdict};

/// Output of one full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub candles: Vec<EnrichedCandle>,
    pub patterns: Vec<Pattern>,
    pub verdict: TrendVerdict,
}

/// Candle processing, pattern scanning and trend reading with one configuration.
#[derive(Default)]
pub struct Pipeline {
    pub scanner: PatternScanner,
    pub reader: TrendReader,
}

impl Pipeline {
    pub fn new(scanner: PatternScanner, reader: TrendReader) -> Self {
        Self { scanner, reader }
    }

    /// Rebuild every indicator from `raw`, then scan and classify the result.
    pub fn run(&self, raw: &[Candle]) -> Analysis {
        let candles = processor::process_full(raw);
        self.analyze_enriched(candles)
    }

    /// Scan and classify an already enriched sequence.
    pub fn analyze_enriched(&self, candles: Vec<EnrichedCandle>) -> Analysis {
        let patterns = self.scanner.scan(&candles);
        let verdict = self.reader.classify(&candles);
        Analysis {
            candles,
            patterns,
            verdict,
        }
    }
}

/// Run the default pipeline over `raw`
pub fn analyze(raw: &[Candle]) -> Analysis {
    Pipeline::default().run(raw)
}

/// Result of analysing a single instrument
#[derive(Debug)]
pub struct InstrumentAnalysis {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Analyse many independent instruments on the rayon pool. Output order follows
/// input order.
pub fn analyze_parallel<'a, I>(pipeline: &Pipeline, instruments: I) -> Vec<InstrumentAnalysis>
where
    I: IntoParallelIterator<Item = (&'a str, &'a [Candle])>,
{
    instruments
        .into_par_iter()
        .map(|(symbol, raw)| InstrumentAnalysis {
            symbol: symbol.to_string(),
            analysis: pipeline.run(raw),
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
