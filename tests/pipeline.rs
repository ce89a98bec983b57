//! Integration tests for candle processing, live ticks, mock history and the
//! end-to-end analysis pipeline.

use candlescope::prelude::*;
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn seeded_history(seed: u64, count: usize) -> Vec<EnrichedCandle> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_mock_history_with(&mut rng, 65_000.0, count, 1_700_000_000_000)
}

fn wave(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let p = 100.0 + (i as f64 / 6.0).sin() * 4.0;
            Candle::new(i as i64 * 60_000, p - 0.3, p + 0.8, p - 0.9, p, 500.0 + i as f64)
        })
        .collect()
}

#[test]
fn test_process_full_display_example() {
    let out = process_full(&[Candle::new(0, 100.0, 106.0, 95.0, 105.0, 1.0)]);
    assert_eq!(out.len(), 1);
    assert!(out[0].is_up);
    assert_eq!(out[0].body, [100.0, 105.0]);
    assert_eq!(out[0].wick, [95.0, 106.0]);
}

#[test]
fn test_process_full_is_deterministic() {
    let raw = wave(120);
    assert_eq!(process_full(&raw), process_full(&raw));
}

#[test]
fn test_process_full_preserves_raw_fields() {
    let raw = wave(40);
    let out = process_full(&raw);
    assert_eq!(out.len(), raw.len());
    for (c, r) in out.iter().zip(&raw) {
        assert_eq!(c.candle(), *r);
    }
}

#[test]
fn test_process_full_tolerates_inconsistent_candles() {
    // high below low, close outside the range
    let raw: Vec<Candle> = (0..60)
        .map(|i| Candle::new(i, 10.0, 9.0, 11.0, 12.0 + (i % 3) as f64, 0.0))
        .collect();
    let out = process_full(&raw);
    assert_eq!(out.len(), 60);
    assert!(out.iter().all(|c| c.rsi.map_or(true, f64::is_finite)));
    let _ = detect_patterns(&out);
    let _ = classify_trend(&out);
}

#[test]
fn test_tick_update_replaces_only_last() {
    let before = process_full(&wave(50));
    let high = before[49].high;
    let after = tick_update(before.clone(), high + 5.0);

    assert_eq!(after.len(), before.len());
    assert_eq!(after[..49], before[..49]);
    assert_eq!(after[49].high, high + 5.0);
    assert_eq!(after[49].close, high + 5.0);
    assert_eq!(after[49].wick[1], high + 5.0);
    // indicators stay stale until the next rebuild
    assert_eq!(after[49].rsi, before[49].rsi);
    assert_eq!(after[49].ema9, before[49].ema9);
    // earlier state survives in the clone
    assert_eq!(before[49].high, high);
}

#[test]
fn test_tick_update_on_long_history_moves_the_buffer() {
    let candles = process_full(&wave(50_000));
    let buffer = candles.as_ptr();
    let after = (0..20).fold(candles, |acc, i| tick_update(acc, 100.0 + i as f64));
    assert_eq!(after.as_ptr(), buffer);
    assert_eq!(after.len(), 50_000);
    assert_eq!(after[49_999].close, 119.0);
}

#[test]
fn test_tick_update_is_idempotent() {
    let candles = process_full(&wave(30));
    let once = tick_update(candles, 97.25);
    let twice = tick_update(once.clone(), 97.25);
    assert_eq!(once, twice);
}

#[test]
fn test_mock_history_shape() {
    let history = generate_mock_history(65_000.0, 150);
    assert_eq!(history.len(), 150);
    assert!(history.windows(2).all(|w| w[1].time - w[0].time == 60_000));
    assert!(history[149].ema9.is_some());
}

#[test]
fn test_seeded_mock_history_is_reproducible() {
    assert_eq!(seeded_history(42, 150), seeded_history(42, 150));
    assert_ne!(seeded_history(42, 150), seeded_history(43, 150));
}

#[test]
fn test_short_history_is_loading() {
    let analysis = analyze(&wave(29));
    assert_eq!(analysis.verdict.trend, Trend::Loading);
    assert_eq!(analysis.verdict.strength, 0);
    assert_eq!(analysis.verdict.score, 0.0);
    assert!(analysis.verdict.signals.is_empty());
}

#[test]
fn test_full_analysis_on_mock_history() {
    let candles = seeded_history(9, 150);
    let analysis = Pipeline::default().analyze_enriched(candles);
    let verdict = &analysis.verdict;

    assert_ne!(verdict.trend, Trend::Loading);
    assert!(analysis.patterns.len() <= 8);
    assert!((-1.0..=1.0).contains(&verdict.score));
    assert_eq!(verdict.strength, (verdict.score.abs() * 100.0).round() as u8);
    assert_eq!(
        verdict.bull_count + verdict.bear_count + verdict.neutral_count,
        verdict.signals.len()
    );
    // every indicator has warmed up after 150 candles
    assert_eq!(verdict.signals.len(), 7);
    assert!(verdict.momentum.ends_with("over 10 candles"));
}

#[test]
fn test_custom_pipeline() {
    let scanner = ScannerBuilder::new()
        .with_chart_defaults()
        .max_results(2)
        .build()
        .unwrap();
    let reader = TrendReader::new(TrendConfig {
        min_candles: 60,
        momentum_lookback: 5,
    })
    .unwrap();
    let pipeline = Pipeline::new(scanner, reader);

    assert_eq!(pipeline.run(&wave(59)).verdict.trend, Trend::Loading);
    let analysis = pipeline.run(&wave(80));
    assert!(analysis.patterns.iter().all(|p| p.is_chart));
    assert!(analysis
        .verdict
        .signals
        .iter()
        .any(|s| s.name == "Momentum (5c)"));
}

#[test]
fn test_parallel_matches_sequential() {
    let a = wave(100);
    let b = wave(45);
    let c = wave(12);
    let instruments = vec![("A", a.as_slice()), ("B", b.as_slice()), ("C", c.as_slice())];

    let pipeline = Pipeline::default();
    let results = analyze_parallel(&pipeline, instruments);
    let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, ["A", "B", "C"]);
    assert_eq!(results[0].analysis.verdict, analyze(&a).verdict);
    assert_eq!(results[1].analysis.patterns, analyze(&b).patterns);
}

#[test]
fn test_config_round_trip() {
    let trend: TrendConfig = serde_json::from_str(r#"{"momentum_lookback": 14}"#).unwrap();
    assert_eq!(trend.min_candles, 30);
    assert_eq!(trend.momentum_lookback, 14);
    let json = serde_json::to_string(&trend).unwrap();
    assert_eq!(serde_json::from_str::<TrendConfig>(&json).unwrap(), trend);

    let ratio: Ratio = serde_json::from_str("0.25").unwrap();
    assert_eq!(ratio.get(), 0.25);
    assert!(serde_json::from_str::<Ratio>("1.5").is_err());
    assert!(serde_json::from_str::<Period>("0").is_err());
}

#[test]
fn test_analysis_serializes_camel_case() {
    let analysis = Pipeline::default().analyze_enriched(seeded_history(3, 60));
    let json = serde_json::to_value(&analysis).unwrap();
    let last = &json["candles"][59];
    assert!(last["isUp"].is_boolean());
    assert!(last["macdHist"].is_number());
    assert!(last["stochK"].is_null());
    assert!(json["verdict"]["bullCount"].is_number());
    let trend = json["verdict"]["trend"].as_str().unwrap();
    assert!(["STRONG_BULL", "BULLISH", "CONSOLIDATING", "BEARISH", "STRONG_BEAR"].contains(&trend));
}

proptest! {
    #[test]
    fn prop_tick_preserves_prefix(price in 1.0f64..200.0, n in 1usize..40) {
        let before = process_full(&wave(n));
        let after = tick_update(before.clone(), price);
        prop_assert_eq!(after.len(), before.len());
        prop_assert_eq!(&after[..n - 1], &before[..n - 1]);
        let last = &after[n - 1];
        prop_assert!(last.high >= price && last.low <= price);
        prop_assert_eq!(last.is_up, price >= last.open);
    }

    #[test]
    fn prop_short_sequences_are_loading(n in 0usize..30) {
        let verdict = classify_trend(&process_full(&wave(n)));
        prop_assert_eq!(verdict, TrendVerdict::loading());
    }
}
