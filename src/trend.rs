//! Trend reading engine
//!
//! Reads up to seven weighted directional signals off the tail of an enriched
//! sequence and folds them into a single [`TrendVerdict`].
//!
//! | Signal            | Weight                 | Bullish when              |
//! |-------------------|------------------------|---------------------------|
//! | EMA 9 / 21 cross  | 1.5                    | `ema9 > ema21`            |
//! | MACD histogram    | 2 on a sign flip, else 1 | histogram > 0           |
//! | RSI (14)          | 1                      | `rsi > 50`                |
//! | ADX directional   | 1.5 if ADX > 20, else 0.5 (no opinion) | +DI > -DI |
//! | Bollinger position| 1                      | close above the midline   |
//! | Price vs SMA 50   | 1                      | close above SMA 50        |
//! | Momentum          | 0.75                   | close above close N ago   |
//!
//! A signal whose inputs are still in warm-up is left out entirely.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, EnrichedCandle, Result};

/// Scores above this (or below its negation) are "strong"
pub const STRONG_THRESHOLD: f64 = 0.65;
/// Scores above this (or below its negation) carry a bias
pub const BIAS_THRESHOLD: f64 = 0.20;
/// ADX above this means the DI lines get a vote
pub const ADX_TRENDING: f64 = 20.0;
/// ADX above this is labelled "Strong"
pub const ADX_STRONG: f64 = 30.0;

const PLACEHOLDER: &str = "—";
const LOADING_COMMENTARY: &str = "Waiting for data…";

// ============================================================
// TREND
// ============================================================

/// Composite trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    StrongBull,
    Bullish,
    Consolidating,
    Bearish,
    StrongBear,
    /// Not enough history yet
    Loading,
}

impl Trend {
    /// Classify a normalized score in `[-1, 1]`. Boundaries fall into the
    /// lower-magnitude band.
    pub fn from_score(score: f64) -> Self {
        if score > STRONG_THRESHOLD {
            Trend::StrongBull
        } else if score > BIAS_THRESHOLD {
            Trend::Bullish
        } else if score < -STRONG_THRESHOLD {
            Trend::StrongBear
        } else if score < -BIAS_THRESHOLD {
            Trend::Bearish
        } else {
            Trend::Consolidating
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::StrongBull => "STRONG BULL",
            Trend::Bullish => "BULLISH",
            Trend::Consolidating => "CONSOLIDATING",
            Trend::Bearish => "BEARISH",
            Trend::StrongBear => "STRONG BEAR",
            Trend::Loading => "LOADING",
        }
    }

    /// Display color as a hex string
    pub fn color(self) -> &'static str {
        match self {
            Trend::StrongBull => "#10b981",
            Trend::Bullish => "#34d399",
            Trend::Consolidating => "#f59e0b",
            Trend::Bearish => "#fb7185",
            Trend::StrongBear => "#f43f5e",
            Trend::Loading => "#64748b",
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, Trend::StrongBull | Trend::Bullish)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Trend::StrongBear | Trend::Bearish)
    }

    /// One-line reading for this trend, quoting the last RSI (rounded)
    fn commentary(self, rsi: Option<f64>) -> String {
        let rsi = rsi.map_or_else(|| PLACEHOLDER.to_string(), |r| format!("{r:.0}"));
        match self {
            Trend::StrongBull => format!(
                "Strong bullish confluence. RSI {rsi}, EMA stack bullish, MACD positive."
            ),
            Trend::Bullish => {
                format!("Moderate bullish bias. RSI {rsi}. Monitor for pullback entries.")
            }
            Trend::Consolidating => {
                format!("No directional edge detected. RSI {rsi}. Await breakout confirmation.")
            }
            Trend::Bearish => {
                format!("Moderate bearish bias. RSI {rsi}. Watch for relief bounce traps.")
            }
            Trend::StrongBear => format!(
                "Strong bearish confluence. RSI {rsi}, EMA stack bearish, MACD negative."
            ),
            Trend::Loading => LOADING_COMMENTARY.to_string(),
        }
    }
}

// ============================================================
// SIGNALS
// ============================================================

/// One directional reading. `bull == None` means the signal has no opinion and
/// does not count toward the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub name: String,
    pub display_value: String,
    pub raw_value: f64,
    pub bull: Option<bool>,
    pub weight: f64,
    pub highlight: bool,
}

impl Signal {
    fn new(name: impl Into<String>, display_value: String, raw_value: f64, bull: bool, weight: f64) -> Self {
        Self {
            name: name.into(),
            display_value,
            raw_value,
            bull: Some(bull),
            weight,
            highlight: false,
        }
    }
}

/// The signal battery, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    EmaCross,
    Macd,
    Rsi,
    Adx,
    Bollinger,
    Sma50,
    Momentum,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Percentage distance of `value` from `base`, 0 when `base` is 0
fn pct_from(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        (value - base) / base * 100.0
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl SignalSource {
    pub const ALL: [SignalSource; 7] = [
        SignalSource::EmaCross,
        SignalSource::Macd,
        SignalSource::Rsi,
        SignalSource::Adx,
        SignalSource::Bollinger,
        SignalSource::Sma50,
        SignalSource::Momentum,
    ];

    /// Read this signal from the tail of `candles`. `None` when its inputs are
    /// unavailable.
    pub fn evaluate(self, candles: &[EnrichedCandle], config: &TrendConfig) -> Option<Signal> {
        let last = candles.last()?;
        match self {
            SignalSource::EmaCross => {
                let (fast, slow) = last.ema9.zip(last.ema21)?;
                let bull = fast > slow;
                let gap = pct_from(fast, slow);
                let display = if bull {
                    format!("↑ Bullish ({gap:.2}%)")
                } else {
                    format!("↓ Bearish ({gap:.2}%)")
                };
                Some(Signal::new("EMA 9 / 21 Cross", display, round2(gap), bull, 1.5))
            }
            SignalSource::Macd => {
                let hist = last.macd_hist?;
                let bull = hist > 0.0;
                let crossing = candles
                    .len()
                    .checked_sub(2)
                    .and_then(|i| candles[i].macd_hist)
                    .is_some_and(|prev| sign(prev) != sign(hist));
                let display = format!(
                    "{}{hist:.2}{}",
                    if bull { "+" } else { "" },
                    if crossing { " ⚡ Cross!" } else { "" }
                );
                let weight = if crossing { 2.0 } else { 1.0 };
                Some(Signal {
                    highlight: crossing,
                    ..Signal::new("MACD Histogram", display, hist, bull, weight)
                })
            }
            SignalSource::Rsi => {
                let rsi = last.rsi?;
                let bull = rsi > 50.0;
                let label = if rsi > 70.0 {
                    "Overbought"
                } else if rsi < 30.0 {
                    "Oversold"
                } else if bull {
                    "Bullish"
                } else {
                    "Bearish"
                };
                Some(Signal::new("RSI (14)", format!("{rsi:.1} - {label}"), rsi, bull, 1.0))
            }
            SignalSource::Adx => {
                let adx = last.adx?;
                let trending = adx > ADX_TRENDING;
                let plus_leads = last.di_plus.unwrap_or(0.0) > last.di_minus.unwrap_or(0.0);
                let quality = if adx > ADX_STRONG {
                    "Strong"
                } else if trending {
                    "Moderate"
                } else {
                    "Weak"
                };
                let leader = if plus_leads { "+DI" } else { "-DI" };
                Some(Signal {
                    bull: trending.then_some(plus_leads),
                    ..Signal::new(
                        "ADX Directional",
                        format!("{adx:.1} - {quality} ({leader} dominant)"),
                        adx,
                        plus_leads,
                        if trending { 1.5 } else { 0.5 },
                    )
                })
            }
            SignalSource::Bollinger => {
                let mid = last.bb_mid?;
                let bull = last.close > mid;
                let near_upper = last.bb_upper.is_some_and(|u| last.close > u * 0.99);
                let near_lower = last.bb_lower.is_some_and(|l| last.close < l * 1.01);
                let suffix = if near_upper {
                    " (Near upper)"
                } else if near_lower {
                    " (Near lower)"
                } else {
                    ""
                };
                let side = if bull { "Above" } else { "Below" };
                Some(Signal::new(
                    "Bollinger Position",
                    format!("{side} midline{suffix}"),
                    pct_from(last.close, mid),
                    bull,
                    1.0,
                ))
            }
            SignalSource::Sma50 => {
                let sma = last.sma50?;
                let bull = last.close > sma;
                let pct = pct_from(last.close, sma);
                let display = if bull {
                    format!("↑ {pct:.2}% above")
                } else {
                    format!("↓ {:.2}% below", pct.abs())
                };
                Some(Signal::new("Price vs SMA 50", display, round2(pct), bull, 1.0))
            }
            SignalSource::Momentum => {
                let lookback = config.momentum_lookback;
                let past = candles
                    .len()
                    .checked_sub(lookback)
                    .and_then(|i| i.checked_sub(1))
                    .map(|i| &candles[i])?;
                if past.close == 0.0 {
                    return None;
                }
                let pct = pct_from(last.close, past.close);
                let bull = pct > 0.0;
                Some(Signal::new(
                    format!("Momentum ({lookback}c)"),
                    format!("{}{pct:.2}%", if bull { "+" } else { "" }),
                    pct,
                    bull,
                    0.75,
                ))
            }
        }
    }
}

// ============================================================
// CONFIG
// ============================================================

/// Trend reader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Below this many candles the verdict is `Trend::Loading`
    pub min_candles: usize,
    /// Candles between the two closes compared by the momentum signal
    pub momentum_lookback: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_candles: 30,
            momentum_lookback: 10,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_candles < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_candles must be at least 2, got {}",
                self.min_candles
            )));
        }
        if self.momentum_lookback == 0 {
            return Err(AnalysisError::InvalidValue("momentum_lookback must be > 0"));
        }
        Ok(())
    }
}

// ============================================================
// VERDICT
// ============================================================

/// Aggregated trend reading
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendVerdict {
    pub trend: Trend,
    /// `round(|score| * 100)`
    pub strength: u8,
    /// Weighted vote in `[-1, 1]`
    pub score: f64,
    pub signals: Vec<Signal>,
    pub bull_count: usize,
    pub bear_count: usize,
    pub neutral_count: usize,
    pub momentum: String,
    pub commentary: String,
}

impl TrendVerdict {
    /// Verdict for a sequence that is still too short
    pub fn loading() -> Self {
        Self {
            trend: Trend::Loading,
            strength: 0,
            score: 0.0,
            signals: Vec::new(),
            bull_count: 0,
            bear_count: 0,
            neutral_count: 0,
            momentum: PLACEHOLDER.to_string(),
            commentary: LOADING_COMMENTARY.to_string(),
        }
    }
}

/// Weighted score over the signals that have an opinion. 0 when none do.
fn aggregate(signals: &[Signal]) -> f64 {
    let (weighted, total) = signals
        .iter()
        .filter_map(|s| s.bull.map(|bull| (bull, s.weight)))
        .fold((0.0, 0.0), |(weighted, total), (bull, w)| {
            (weighted + if bull { w } else { -w }, total + w)
        });
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

// ============================================================
// READER
// ============================================================

/// Trend reading engine
#[derive(Debug, Clone, Default)]
pub struct TrendReader {
    config: TrendConfig,
}

impl TrendReader {
    pub fn new(config: TrendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Classify the trend at the end of `candles`
    pub fn classify(&self, candles: &[EnrichedCandle]) -> TrendVerdict {
        let Some(last) = candles.last().filter(|_| candles.len() >= self.config.min_candles)
        else {
            return TrendVerdict::loading();
        };

        let signals: Vec<Signal> = SignalSource::ALL
            .iter()
            .filter_map(|source| source.evaluate(candles, &self.config))
            .collect();

        let score = aggregate(&signals);
        let trend = Trend::from_score(score);
        let strength = (score.abs() * 100.0).round() as u8;

        let momentum = SignalSource::Momentum
            .evaluate(candles, &self.config)
            .map_or_else(
                || PLACEHOLDER.to_string(),
                |m| {
                    format!(
                        "{} {:.2}% over {} candles",
                        if m.bull == Some(true) { "Positive" } else { "Negative" },
                        m.raw_value.abs(),
                        self.config.momentum_lookback
                    )
                },
            );

        let count = |want: Option<bool>| signals.iter().filter(|s| s.bull == want).count();
        let verdict = TrendVerdict {
            trend,
            strength,
            score,
            bull_count: count(Some(true)),
            bear_count: count(Some(false)),
            neutral_count: count(None),
            momentum,
            commentary: trend.commentary(last.rsi),
            signals,
        };
        debug!(
            "trend {} (score {:.3}, {} signals)",
            trend.label(),
            score,
            verdict.signals.len()
        );
        verdict
    }
}

/// Classify with the default [`TrendReader`]
pub fn classify_trend(candles: &[EnrichedCandle]) -> TrendVerdict {
    TrendReader::default().classify(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn series(closes: impl IntoIterator<Item = f64>) -> Vec<EnrichedCandle> {
        closes
            .into_iter()
            .enumerate()
            .map(|(i, c)| EnrichedCandle::from(Candle::new(i as i64, c, c + 1.0, c - 1.0, c, 10.0)))
            .collect()
    }

    /// 30 rising closes (100..=129) with every indicator leaning bullish
    fn bullish_tail() -> Vec<EnrichedCandle> {
        let mut candles = series((0..30).map(|i| 100.0 + i as f64));
        candles[28].macd_hist = Some(0.4);
        let last = candles.last_mut().unwrap();
        last.ema9 = Some(128.0);
        last.ema21 = Some(120.0);
        last.macd_hist = Some(0.5);
        last.rsi = Some(65.0);
        last.adx = Some(25.0);
        last.di_plus = Some(30.0);
        last.di_minus = Some(10.0);
        last.bb_upper = Some(130.0);
        last.bb_mid = Some(120.0);
        last.bb_lower = Some(110.0);
        candles
    }

    #[test]
    fn test_loading_below_min_candles() {
        let v = classify_trend(&series((0..29).map(|i| 100.0 + i as f64)));
        assert_eq!(v.trend, Trend::Loading);
        assert_eq!(v.strength, 0);
        assert_eq!(v.score, 0.0);
        assert!(v.signals.is_empty());
        assert_eq!(v.commentary, "Waiting for data…");
        assert_eq!(classify_trend(&[]), TrendVerdict::loading());
    }

    #[test]
    fn test_strong_bull() {
        let v = classify_trend(&bullish_tail());
        assert_eq!(v.trend, Trend::StrongBull);
        assert_eq!(v.strength, 100);
        assert_eq!(v.score, 1.0);
        // SMA 50 is still warming up
        assert_eq!(v.signals.len(), 6);
        assert_eq!((v.bull_count, v.bear_count, v.neutral_count), (6, 0, 0));
        assert_eq!(v.momentum, "Positive 8.40% over 10 candles");
        assert_eq!(
            v.commentary,
            "Strong bullish confluence. RSI 65, EMA stack bullish, MACD positive."
        );
    }

    #[test]
    fn test_signal_order_and_display() {
        let v = classify_trend(&bullish_tail());
        let names: Vec<&str> = v.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "EMA 9 / 21 Cross",
                "MACD Histogram",
                "RSI (14)",
                "ADX Directional",
                "Bollinger Position",
                "Momentum (10c)"
            ]
        );
        let display: Vec<&str> = v.signals.iter().map(|s| s.display_value.as_str()).collect();
        assert_eq!(display[0], "↑ Bullish (6.67%)");
        assert_eq!(display[1], "+0.50");
        assert_eq!(display[2], "65.0 - Bullish");
        assert_eq!(display[3], "25.0 - Moderate (+DI dominant)");
        assert_eq!(display[4], "Above midline (Near upper)");
        assert_eq!(display[5], "+8.40%");
        assert_eq!(v.signals[0].raw_value, 6.67);
    }

    #[test]
    fn test_macd_cross_weight() {
        let mut candles = bullish_tail();
        candles[28].macd_hist = Some(-0.2);
        let signal = SignalSource::Macd
            .evaluate(&candles, &TrendConfig::default())
            .unwrap();
        assert_eq!(signal.weight, 2.0);
        assert!(signal.highlight);
        assert_eq!(signal.display_value, "+0.50 ⚡ Cross!");
    }

    #[test]
    fn test_weak_adx_has_no_opinion() {
        let mut candles = bullish_tail();
        candles[29].adx = Some(15.0);
        candles[29].di_plus = Some(5.0);
        candles[29].di_minus = Some(20.0);
        let v = classify_trend(&candles);
        let adx = &v.signals[3];
        assert_eq!(adx.bull, None);
        assert_eq!(adx.weight, 0.5);
        assert_eq!(adx.display_value, "15.0 - Weak (-DI dominant)");
        assert_eq!(v.neutral_count, 1);
        // neutral signals are left out of the score
        assert_eq!(v.score, 1.0);
    }

    #[test]
    fn test_adx_threshold_is_exclusive() {
        let mut candles = bullish_tail();
        candles[29].adx = Some(ADX_TRENDING);
        let config = TrendConfig::default();
        let at = SignalSource::Adx.evaluate(&candles, &config).unwrap();
        assert_eq!(at.bull, None);
        assert_eq!(at.weight, 0.5);
        assert_eq!(at.display_value, "20.0 - Weak (+DI dominant)");

        candles[29].adx = Some(20.5);
        let above = SignalSource::Adx.evaluate(&candles, &config).unwrap();
        assert_eq!(above.bull, Some(true));
        assert_eq!(above.weight, 1.5);
    }

    #[test]
    fn test_mixed_signals_consolidate() {
        let mut candles = series(std::iter::repeat(100.0).take(30));
        let last = candles.last_mut().unwrap();
        last.ema9 = Some(101.0);
        last.ema21 = Some(100.0);
        last.rsi = Some(40.0);
        let v = classify_trend(&candles);
        // +1.5 - 1 - 0.75 (flat momentum is not bullish)
        let expected = -0.25 / 3.25;
        assert!((v.score - expected).abs() < 1e-12);
        assert_eq!(v.trend, Trend::Consolidating);
        assert_eq!(v.strength, 8);
        assert_eq!(v.momentum, "Negative 0.00% over 10 candles");
        assert_eq!(
            v.commentary,
            "No directional edge detected. RSI 40. Await breakout confirmation."
        );
    }

    #[test]
    fn test_sma_signal_below() {
        let mut candles = series(std::iter::repeat(100.0).take(30));
        candles[29].sma50 = Some(125.0);
        let signal = SignalSource::Sma50
            .evaluate(&candles, &TrendConfig::default())
            .unwrap();
        assert_eq!(signal.bull, Some(false));
        assert_eq!(signal.display_value, "↓ 20.00% below");
        assert_eq!(signal.raw_value, -20.0);
    }

    #[test]
    fn test_momentum_needs_lookback() {
        let candles = series((0..10).map(f64::from));
        assert!(SignalSource::Momentum
            .evaluate(&candles, &TrendConfig::default())
            .is_none());
    }

    #[test]
    fn test_score_boundaries() {
        assert_eq!(Trend::from_score(1.0), Trend::StrongBull);
        assert_eq!(Trend::from_score(0.65), Trend::Bullish);
        assert_eq!(Trend::from_score(0.2), Trend::Consolidating);
        assert_eq!(Trend::from_score(0.0), Trend::Consolidating);
        assert_eq!(Trend::from_score(-0.2), Trend::Consolidating);
        assert_eq!(Trend::from_score(-0.21), Trend::Bearish);
        assert_eq!(Trend::from_score(-0.65), Trend::Bearish);
        assert_eq!(Trend::from_score(-0.66), Trend::StrongBear);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::StrongBear.label(), "STRONG BEAR");
        assert_eq!(Trend::Loading.color(), "#64748b");
        assert!(Trend::Bullish.is_bullish());
        assert!(!Trend::Consolidating.is_bullish());
        assert!(Trend::StrongBear.is_bearish());
    }

    #[test]
    fn test_config_validation() {
        assert!(TrendReader::new(TrendConfig::default()).is_ok());
        let short = TrendConfig {
            min_candles: 1,
            ..Default::default()
        };
        assert!(TrendReader::new(short).is_err());
        let no_lookback = TrendConfig {
            momentum_lookback: 0,
            ..Default::default()
        };
        assert!(no_lookback.validate().is_err());
    }

    #[test]
    fn test_oversized_lookback_drops_momentum() {
        let reader = TrendReader::new(TrendConfig {
            momentum_lookback: usize::MAX,
            ..Default::default()
        })
        .unwrap();
        let verdict = reader.classify(&series((0..40).map(|i| 100.0 + i as f64)));
        assert_ne!(verdict.trend, Trend::Loading);
        assert_eq!(verdict.momentum, PLACEHOLDER);
        assert!(verdict.signals.iter().all(|s| !s.name.starts_with("Momentum")));
    }

    #[test]
    fn test_custom_min_candles() {
        let reader = TrendReader::new(TrendConfig {
            min_candles: 12,
            momentum_lookback: 5,
        })
        .unwrap();
        let v = reader.classify(&series((0..12).map(|i| 100.0 + i as f64)));
        assert_ne!(v.trend, Trend::Loading);
        assert_eq!(v.signals[0].name, "Momentum (5c)");
        assert_eq!(v.trend, Trend::StrongBull);
    }
}
