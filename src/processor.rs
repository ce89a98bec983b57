//! Candle processor
//!
//! Runs the indicator pipeline over raw candles, applies live price ticks to the
//! last candle and synthesizes fallback history.

use chrono::Utc;
use log::{debug, trace, warn};
use rand::Rng;

use crate::{
    indicators::{self, AverageLine, ADX_PERIOD, BOLLINGER_MULT, BOLLINGER_PERIOD, RSI_PERIOD},
    Candle, EnrichedCandle,
};

/// Spacing between synthesized candles (one minute)
pub const MOCK_INTERVAL_MS: i64 = 60_000;

/// Per-candle volatility of the mock walk, as a fraction of the base price
const MOCK_VOLATILITY: f64 = 0.0022;

/// Mid-point of the walk's random step. Slightly below 0.5 so the walk drifts up.
const MOCK_DRIFT_CENTER: f64 = 0.475;

/// Wick extension as a fraction of the volatility
const MOCK_WICK_FACTOR: f64 = 0.4;

// ============================================================
// FULL REBUILD
// ============================================================

/// Rebuild every indicator over `raw`.
///
/// Order: EMA9, EMA21, SMA50, MACD (with its own EMA12/EMA26), RSI14,
/// Bollinger(20, 2), ADX14, OBV, then the display fields. Stochastic is not part
/// of the rebuild; use [`indicators::with_stochastic`] on the result if needed.
pub fn process_full(raw: &[Candle]) -> Vec<EnrichedCandle> {
    if raw.is_empty() {
        return Vec::new();
    }

    let base: Vec<EnrichedCandle> = raw.iter().map(EnrichedCandle::from).collect();
    let d = indicators::with_average(&base, AverageLine::Ema9);
    let d = indicators::with_average(&d, AverageLine::Ema21);
    let d = indicators::with_average(&d, AverageLine::Sma50);
    let d = indicators::with_macd(&d);
    let d = indicators::with_rsi(&d, RSI_PERIOD);
    let d = indicators::with_bollinger(&d, BOLLINGER_PERIOD, BOLLINGER_MULT);
    let d = indicators::with_adx(&d, ADX_PERIOD);
    let mut d = indicators::with_obv(&d);
    d.iter_mut().for_each(EnrichedCandle::refresh_display);

    debug!("rebuilt indicators for {} candles", d.len());
    d
}

// ============================================================
// LIVE TICKS
// ============================================================

/// Apply a live `price` to the last candle in place.
///
/// Sets the close, widens high/low to include the price and refreshes the
/// display fields. Indicator fields on that candle stay as they were until the
/// next [`process_full`]. Does nothing on an empty sequence.
pub fn apply_tick(candles: &mut [EnrichedCandle], price: f64) {
    let Some(last) = candles.last_mut() else {
        warn!("tick at {price} ignored: no candles loaded");
        return;
    };
    last.close = price;
    last.high = last.high.max(price);
    last.low = last.low.min(price);
    last.refresh_display();
    trace!("tick {price} applied to candle at {}", last.time);
}

/// Take ownership of `candles`, apply `price` to the last candle and hand the
/// sequence back.
///
/// The buffer is moved, not copied, so every element but the last is carried
/// over untouched in O(1). Clone first if the previous state must be kept.
pub fn tick_update(mut candles: Vec<EnrichedCandle>, price: f64) -> Vec<EnrichedCandle> {
    apply_tick(&mut candles, price);
    candles
}

// ============================================================
// MOCK HISTORY
// ============================================================

/// Synthesize `count` one-minute candles ending now around `base_price` and run
/// them through [`process_full`].
///
/// Uses the thread RNG, so every call differs. Meant as a placeholder data source
/// until real history arrives.
pub fn generate_mock_history(base_price: f64, count: usize) -> Vec<EnrichedCandle> {
    generate_mock_history_with(
        &mut rand::rng(),
        base_price,
        count,
        Utc::now().timestamp_millis(),
    )
}

/// Mock history driven by a caller-supplied RNG. The last candle is stamped
/// `end_time_ms`, earlier ones step back by [`MOCK_INTERVAL_MS`].
pub fn generate_mock_history_with<R: Rng>(
    rng: &mut R,
    base_price: f64,
    count: usize,
    end_time_ms: i64,
) -> Vec<EnrichedCandle> {
    if count == 0 {
        warn!("mock history requested with zero candles");
        return Vec::new();
    }

    let volatility = base_price * MOCK_VOLATILITY;
    let raw: Vec<Candle> = (0..count)
        .rev()
        .scan(base_price, |price, steps_back| {
            let open = *price;
            let close = open + (rng.random::<f64>() - MOCK_DRIFT_CENTER) * volatility;
            let high = open.max(close) + rng.random::<f64>() * volatility * MOCK_WICK_FACTOR;
            let low = open.min(close) - rng.random::<f64>() * volatility * MOCK_WICK_FACTOR;
            let volume = rng.random::<f64>() * 1200.0 + 200.0;
            *price = close;

            let time = end_time_ms - steps_back as i64 * MOCK_INTERVAL_MS;
            Some(Candle::new(time, open, high, low, close, volume))
        })
        .collect();

    process_full(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CandleColor;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_process_full_empty() {
        assert!(process_full(&[]).is_empty());
    }

    #[test]
    fn test_process_full_display_fields() {
        let out = process_full(&[Candle::new(0, 100.0, 106.0, 95.0, 105.0, 10.0)]);
        let c = &out[0];
        assert!(c.is_up);
        assert_eq!(c.color, CandleColor::Bull);
        assert_eq!(c.body, [100.0, 105.0]);
        assert_eq!(c.wick, [95.0, 106.0]);
        assert!(c.ema9.is_none());
        assert_eq!(c.obv, Some(0.0));
        assert!(c.adx.is_none());
    }

    #[test]
    fn test_process_full_fills_every_pipeline_field() {
        let raw: Vec<Candle> = (0..60)
            .map(|i| {
                let p = 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1;
                Candle::new(i, p - 0.2, p + 1.0, p - 1.0, p, 50.0)
            })
            .collect();
        let last = process_full(&raw).pop().unwrap();
        for (name, v) in [
            ("ema9", last.ema9),
            ("ema12", last.ema12),
            ("ema21", last.ema21),
            ("ema26", last.ema26),
            ("sma50", last.sma50),
            ("macd_hist", last.macd_hist),
            ("rsi", last.rsi),
            ("bb_width", last.bb_width),
            ("adx", last.adx),
            ("obv", last.obv),
        ] {
            assert!(v.is_some(), "{name} missing");
        }
        assert!(last.stoch_k.is_none());
    }

    #[test]
    fn test_apply_tick() {
        let mut candles = process_full(&[
            Candle::new(0, 100.0, 101.0, 99.0, 100.5, 1.0),
            Candle::new(1, 100.5, 101.0, 100.0, 100.8, 1.0),
        ]);
        apply_tick(&mut candles, 99.5);
        let last = &candles[1];
        assert_eq!(last.close, 99.5);
        assert_eq!(last.low, 99.5);
        assert_eq!(last.high, 101.0);
        assert!(!last.is_up);
        assert_eq!(last.color, CandleColor::Bear);
        assert_eq!(last.body, [99.5, 100.5]);
        assert_eq!(last.wick, [99.5, 101.0]);
    }

    #[test]
    fn test_tick_on_empty_sequence() {
        let mut empty: Vec<EnrichedCandle> = Vec::new();
        apply_tick(&mut empty, 10.0);
        assert!(empty.is_empty());
        assert!(tick_update(Vec::new(), 10.0).is_empty());
    }

    #[test]
    fn test_tick_update_reuses_buffer() {
        let candles = process_full(&[
            Candle::new(0, 100.0, 101.0, 99.0, 100.5, 1.0),
            Candle::new(1, 100.5, 101.0, 100.0, 100.8, 1.0),
        ]);
        let first = candles[0].clone();
        let buffer = candles.as_ptr();

        let next = tick_update(candles, 102.0);
        assert_eq!(next.as_ptr(), buffer);
        assert_eq!(next[0], first);
        assert_eq!(next[1].high, 102.0);
    }

    #[test]
    fn test_mock_history_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let first = generate_mock_history_with(&mut a, 65_000.0, 40, 1_000_000);
        let second = generate_mock_history_with(&mut b, 65_000.0, 40, 1_000_000);
        assert_eq!(first, second);
        assert_eq!(first.last().unwrap().time, 1_000_000);
        assert_eq!(first[0].time, 1_000_000 - 39 * MOCK_INTERVAL_MS);
        assert_eq!(first[0].open, 65_000.0);
        assert!(first.windows(2).all(|w| w[1].open == w[0].close));
        assert!(first.iter().all(|c| (200.0..1400.0).contains(&c.volume)));
    }

    #[test]
    fn test_mock_history_zero_count() {
        assert!(generate_mock_history_with(&mut StdRng::seed_from_u64(1), 100.0, 0, 0).is_empty());
    }
}
