//! Indicator library
//!
//! Two layers:
//!
//! - Series functions (`ema`, `sma`, `macd`, `rsi`, `bollinger`, `adx`,
//!   `stochastic_k`, `stochastic_d`, `obv`) take closes or any [`OHLCV`] slice and
//!   return one entry per input, `None` during warm-up.
//! - Sequence functions (`with_*`) take an enriched sequence and return a new one
//!   with the matching [`EnrichedCandle`] fields filled in. The input is never
//!   modified and every other field is carried over.
//!
//! None of these fail: empty input gives empty output and a period of zero gives
//! all `None`.
//!
//! Recurrences (EMA, MACD signal, ADX smoothing, OBV) are written as a `fold` over
//! the sequence with the running state as the accumulator.

use serde::{Deserialize, Serialize};

use crate::{EnrichedCandle, OHLCV};

/// Default RSI lookback
pub const RSI_PERIOD: usize = 14;
/// Default Bollinger window
pub const BOLLINGER_PERIOD: usize = 20;
/// Default Bollinger band width in standard deviations
pub const BOLLINGER_MULT: f64 = 2.0;
/// Default ADX smoothing period
pub const ADX_PERIOD: usize = 14;
/// Default Stochastic %K lookback
pub const STOCH_K_PERIOD: usize = 14;
/// Default Stochastic %D smoothing
pub const STOCH_D_PERIOD: usize = 3;
/// MACD signal line smoothing factor (an EMA9-style `2 / (9 + 1)`)
pub const MACD_SIGNAL_K: f64 = 2.0 / 10.0;
/// %K reported when the lookback window has zero range
pub const STOCH_FLAT_K: f64 = 50.0;

// ============================================================
// OUTPUT TYPES
// ============================================================

/// Moving averages that have a dedicated [`EnrichedCandle`] field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AverageLine {
    Ema9,
    Ema12,
    Ema21,
    Ema26,
    Sma50,
}

impl AverageLine {
    pub const ALL: [AverageLine; 5] = [
        AverageLine::Ema9,
        AverageLine::Ema12,
        AverageLine::Ema21,
        AverageLine::Ema26,
        AverageLine::Sma50,
    ];

    pub fn period(self) -> usize {
        match self {
            AverageLine::Ema9 => 9,
            AverageLine::Ema12 => 12,
            AverageLine::Ema21 => 21,
            AverageLine::Ema26 => 26,
            AverageLine::Sma50 => 50,
        }
    }

    pub fn is_exponential(self) -> bool {
        !matches!(self, AverageLine::Sma50)
    }

    /// Current value of this line on `candle`
    pub fn value(self, candle: &EnrichedCandle) -> Option<f64> {
        match self {
            AverageLine::Ema9 => candle.ema9,
            AverageLine::Ema12 => candle.ema12,
            AverageLine::Ema21 => candle.ema21,
            AverageLine::Ema26 => candle.ema26,
            AverageLine::Sma50 => candle.sma50,
        }
    }

    fn slot(self, candle: &mut EnrichedCandle) -> &mut Option<f64> {
        match self {
            AverageLine::Ema9 => &mut candle.ema9,
            AverageLine::Ema12 => &mut candle.ema12,
            AverageLine::Ema21 => &mut candle.ema21,
            AverageLine::Ema26 => &mut candle.ema26,
            AverageLine::Sma50 => &mut candle.sma50,
        }
    }

    /// Compute this line over `closes`
    pub fn series(self, closes: &[f64]) -> Vec<Option<f64>> {
        if self.is_exponential() {
            ema(closes, self.period())
        } else {
            sma(closes, self.period())
        }
    }
}

/// One MACD reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// One Bollinger reading. `width` is `(upper - lower) / mid`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    pub width: f64,
}

/// One directional-movement reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Directional {
    pub adx: f64,
    pub di_plus: f64,
    pub di_minus: f64,
}

// ============================================================
// SERIES FUNCTIONS
// ============================================================

#[inline]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Exponential moving average with `k = 2 / (period + 1)`.
///
/// Entry `period - 1` is seeded with the mean of the first `period` closes.
pub fn ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || closes.len() < period {
        return vec![None; closes.len()];
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = mean(&closes[..period]);

    closes
        .iter()
        .enumerate()
        .fold(
            (None, Vec::with_capacity(closes.len())),
            |(prev, mut out), (i, &close)| {
                let next = if i + 1 < period {
                    None
                } else if i + 1 == period {
                    Some(seed)
                } else {
                    prev.map(|p: f64| close * k + p * (1.0 - k))
                };
                out.push(next);
                (next, out)
            },
        )
        .1
}

/// Trailing-window simple moving average
pub fn sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| (period > 0 && i + 1 >= period).then(|| mean(&closes[i + 1 - period..=i])))
        .collect()
}

/// MACD over closes: EMA12 - EMA26 with the signal line from [`macd_from_lines`].
pub fn macd(closes: &[f64]) -> Vec<Option<MacdPoint>> {
    macd_from_lines(&ema(closes, 12), &ema(closes, 26))
}

/// MACD from precomputed fast and slow averages.
///
/// The signal line is smoothed with [`MACD_SIGNAL_K`] and seeded with the first
/// available MACD value, so the first histogram is always 0.
pub fn macd_from_lines(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<Option<MacdPoint>> {
    fast.iter()
        .zip(slow)
        .fold(
            (None, Vec::with_capacity(fast.len())),
            |(prev_signal, mut out): (Option<f64>, Vec<_>), (f, s)| {
                let Some(line) = f.zip(*s).map(|(f, s)| f - s) else {
                    out.push(None);
                    return (prev_signal, out);
                };
                let signal = match prev_signal {
                    Some(prev) => line * MACD_SIGNAL_K + prev * (1.0 - MACD_SIGNAL_K),
                    None => line,
                };
                out.push(Some(MacdPoint {
                    line,
                    signal,
                    histogram: line - signal,
                }));
                (Some(signal), out)
            },
        )
        .1
}

/// Relative strength index over the `period` close-to-close changes ending at each
/// index. `None` for indices below `period`.
///
/// A window without losses reports exactly 100. That includes a flat window,
/// where gains and losses are both 0.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let (gains, losses) = closes[i - period..=i].windows(2).fold(
                (0.0, 0.0),
                |(gains, losses), pair| {
                    let diff = pair[1] - pair[0];
                    if diff > 0.0 {
                        (gains + diff, losses)
                    } else {
                        (gains, losses - diff)
                    }
                },
            );
            if losses == 0.0 {
                return Some(100.0);
            }
            let rs = gains / losses;
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}

/// Bollinger bands from the trailing mean and population standard deviation.
///
/// `width` is 0 when the mean is 0.
pub fn bollinger(closes: &[f64], period: usize, mult: f64) -> Vec<Option<Bands>> {
    (0..closes.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            let mid = mean(window);
            let variance = window.iter().map(|c| (c - mid).powi(2)).sum::<f64>() / period as f64;
            let spread = mult * variance.sqrt();
            let (upper, lower) = (mid + spread, mid - spread);
            let width = if mid == 0.0 {
                0.0
            } else {
                (upper - lower) / mid
            };
            Some(Bands {
                upper,
                mid,
                lower,
                width,
            })
        })
        .collect()
}

/// Smoothed true range, +DM and -DM
#[derive(Debug, Clone, Copy)]
struct DirectionalState {
    tr: f64,
    dm_plus: f64,
    dm_minus: f64,
}

impl DirectionalState {
    fn advance(prev: Option<Self>, tr: f64, dm_plus: f64, dm_minus: f64, period: f64) -> Self {
        let smooth = |sm: f64, value: f64| sm - sm / period + value;
        match prev {
            None => Self {
                tr,
                dm_plus,
                dm_minus,
            },
            Some(p) => Self {
                tr: smooth(p.tr, tr),
                dm_plus: smooth(p.dm_plus, dm_plus),
                dm_minus: smooth(p.dm_minus, dm_minus),
            },
        }
    }

    fn reading(self) -> Directional {
        let (di_plus, di_minus) = if self.tr == 0.0 {
            (0.0, 0.0)
        } else {
            (
                100.0 * self.dm_plus / self.tr,
                100.0 * self.dm_minus / self.tr,
            )
        };
        let sum = di_plus + di_minus;
        let adx = if sum > 0.0 {
            100.0 * (di_plus - di_minus).abs() / sum
        } else {
            0.0
        };
        Directional {
            adx,
            di_plus,
            di_minus,
        }
    }
}

/// Directional movement with a single running smoothing pass
/// (`sm = sm - sm / period + value`, first value taken as is).
///
/// The reported `adx` is the per-candle DX of the smoothed DI lines; there is no
/// second smoothing pass. Index 0 is always `None`.
pub fn adx<T: OHLCV>(candles: &[T], period: usize) -> Vec<Option<Directional>> {
    if period == 0 {
        return vec![None; candles.len()];
    }
    let period = period as f64;
    let first = candles.first().map(|_| None);

    first
        .into_iter()
        .chain(
            candles
                .windows(2)
                .scan(None, |state: &mut Option<DirectionalState>, pair| {
                    let (prev, curr) = (&pair[0], &pair[1]);
                    let tr = (curr.high() - curr.low())
                        .max((curr.high() - prev.close()).abs())
                        .max((curr.low() - prev.close()).abs());
                    let up = curr.high() - prev.high();
                    let down = prev.low() - curr.low();
                    let dm_plus = if up > down { up.max(0.0) } else { 0.0 };
                    let dm_minus = if down > up { down.max(0.0) } else { 0.0 };

                    let next = DirectionalState::advance(*state, tr, dm_plus, dm_minus, period);
                    *state = Some(next);
                    Some(Some(next.reading()))
                }),
        )
        .collect()
}

/// Stochastic %K over the trailing `period` highs and lows.
///
/// A window with zero range reports [`STOCH_FLAT_K`].
pub fn stochastic_k<T: OHLCV>(candles: &[T], period: usize) -> Vec<Option<f64>> {
    (0..candles.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &candles[i + 1 - period..=i];
            let lowest = window.iter().map(|c| c.low()).fold(f64::INFINITY, f64::min);
            let highest = window
                .iter()
                .map(|c| c.high())
                .fold(f64::NEG_INFINITY, f64::max);
            if highest == lowest {
                return Some(STOCH_FLAT_K);
            }
            Some(100.0 * (candles[i].close() - lowest) / (highest - lowest))
        })
        .collect()
}

/// Stochastic %D: mean of the last `period` %K values, `None` unless all of them
/// are present.
pub fn stochastic_d(k: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..k.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &k[i + 1 - period..=i];
            let sum = window.iter().copied().sum::<Option<f64>>()?;
            Some(sum / period as f64)
        })
        .collect()
}

/// On-balance volume starting from 0
pub fn obv<T: OHLCV>(candles: &[T]) -> Vec<f64> {
    let Some(first) = candles.first() else {
        return Vec::new();
    };
    candles
        .iter()
        .scan((0.0, first.close()), |(total, prev_close), c| {
            if c.close() > *prev_close {
                *total += c.volume();
            } else if c.close() < *prev_close {
                *total -= c.volume();
            }
            *prev_close = c.close();
            Some(*total)
        })
        .collect()
}

// ============================================================
// SEQUENCE FUNCTIONS
// ============================================================

/// Closing prices of an enriched sequence
pub fn closes(candles: &[EnrichedCandle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Copy `candles`, handing each copy and its value to `set`
fn annotate<V>(
    candles: &[EnrichedCandle],
    values: Vec<V>,
    set: impl Fn(&mut EnrichedCandle, V),
) -> Vec<EnrichedCandle> {
    candles
        .iter()
        .zip(values)
        .map(|(c, v)| {
            let mut c = c.clone();
            set(&mut c, v);
            c
        })
        .collect()
}

/// Fill the field belonging to `line`
pub fn with_average(candles: &[EnrichedCandle], line: AverageLine) -> Vec<EnrichedCandle> {
    annotate(candles, line.series(&closes(candles)), |c, v| {
        *line.slot(c) = v
    })
}

/// Fill `ema12`, `ema26` and the three MACD fields
pub fn with_macd(candles: &[EnrichedCandle]) -> Vec<EnrichedCandle> {
    let prices = closes(candles);
    let fast = ema(&prices, 12);
    let slow = ema(&prices, 26);
    let points = macd_from_lines(&fast, &slow);
    let values = fast.into_iter().zip(slow).zip(points).collect();

    annotate(candles, values, |c, ((fast, slow), point)| {
        c.ema12 = fast;
        c.ema26 = slow;
        c.macd_line = point.map(|p| p.line);
        c.macd_signal = point.map(|p| p.signal);
        c.macd_hist = point.map(|p| p.histogram);
    })
}

pub fn with_rsi(candles: &[EnrichedCandle], period: usize) -> Vec<EnrichedCandle> {
    annotate(candles, rsi(&closes(candles), period), |c, v| c.rsi = v)
}

pub fn with_bollinger(candles: &[EnrichedCandle], period: usize, mult: f64) -> Vec<EnrichedCandle> {
    annotate(candles, bollinger(&closes(candles), period, mult), |c, b| {
        c.bb_upper = b.map(|b| b.upper);
        c.bb_mid = b.map(|b| b.mid);
        c.bb_lower = b.map(|b| b.lower);
        c.bb_width = b.map(|b| b.width);
    })
}

pub fn with_adx(candles: &[EnrichedCandle], period: usize) -> Vec<EnrichedCandle> {
    annotate(candles, adx(candles, period), |c, d| {
        c.adx = d.map(|d| d.adx);
        c.di_plus = d.map(|d| d.di_plus);
        c.di_minus = d.map(|d| d.di_minus);
    })
}

/// Fill `stoch_k` and `stoch_d`
pub fn with_stochastic(
    candles: &[EnrichedCandle],
    k_period: usize,
    d_period: usize,
) -> Vec<EnrichedCandle> {
    let k = stochastic_k(candles, k_period);
    let d = stochastic_d(&k, d_period);
    annotate(candles, k.into_iter().zip(d).collect(), |c, (k, d)| {
        c.stoch_k = k;
        c.stoch_d = d;
    })
}

pub fn with_obv(candles: &[EnrichedCandle]) -> Vec<EnrichedCandle> {
    annotate(candles, obv(candles), |c, v| c.obv = Some(v))
}
