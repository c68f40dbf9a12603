//! End-to-end properties of the signal scorer.

use trendsig_core::indicators::IndicatorSet;
use trendsig_tests::*;

#[tokio::test]
async fn steady_uptrend_produces_a_buy() {
    let sym = symbol("600519");
    // Sixty sessions gaining 0.3% a day on flat volume: aligned bull
    // averages, a modest bias, nothing overheated except RSI.
    let bars = bars_from_closes(&uptrend_closes(60, 0.003));

    let result = TrendAnalyzer::new().analyze(&sym, &bars);

    assert!(result.trend_state.is_bullish());
    assert!(result.ma5 > result.ma10 && result.ma10 > result.ma20);
    assert!(
        (55..=75).contains(&result.signal_score),
        "score {} out of the expected band",
        result.signal_score
    );
    assert!(result.buy_signal.is_buy());
    assert!(!result.signal_reasons.is_empty());
}

#[tokio::test]
async fn steady_downtrend_never_signals_a_buy() {
    let sym = symbol("600519");
    let closes: Vec<f64> = (0..60).map(|i| 50.0 * 0.995_f64.powi(i)).collect();
    let bars = bars_from_closes(&closes);

    let result = TrendAnalyzer::new().analyze(&sym, &bars);

    assert!(result.trend_state.is_bearish_alignment() || !result.trend_state.is_bullish());
    assert!(!result.buy_signal.is_buy());
    assert!(result.ma5 < result.ma20);
}

#[tokio::test]
async fn rsi_stays_in_bounds_and_tracks_direction() {
    let sym = symbol("600519");
    let closes: Vec<f64> = (0..60)
        .map(|i| 20.0 + (i as f64 * 0.7).sin() * 2.0 + i as f64 * 0.05)
        .collect();
    let bars = bars_from_closes(&closes);

    let result = TrendAnalyzer::new().analyze(&sym, &bars);
    for rsi in [result.rsi_6, result.rsi_12, result.rsi_24] {
        assert!((0.0..=100.0).contains(&rsi), "rsi {rsi} out of bounds");
    }

    // Twenty-five straight up sessions push the 12-period RSI above 60.
    let rising: Vec<f64> = (0..30).map(|i| 10.0 + i as f64 * 0.2).collect();
    let result = TrendAnalyzer::new().analyze(&sym, &bars_from_closes(&rising));
    assert!(result.rsi_12 > 60.0, "rsi12 was {}", result.rsi_12);
}

#[tokio::test]
async fn v_shaped_reversal_prints_a_golden_cross() {
    let sym = symbol("600519");
    // Forty sessions down, then a sharp recovery.
    let mut closes: Vec<f64> = (0..40).map(|i| 50.0 * 0.99_f64.powi(i)).collect();
    let bottom = closes[closes.len() - 1];
    closes.extend((1..=40).map(|i| bottom * 1.012_f64.powi(i)));
    let bars = bars_from_closes(&closes);

    let macd = IndicatorSet::compute(&bars).macd;
    // The DIF can reclaim the DEA on the very first recovery bar.
    let cross_at = (1..closes.len())
        .find(|&i| macd.dif[i - 1] <= macd.dea[i - 1] && macd.dif[i] > macd.dea[i])
        .expect("the recovery must cross DIF above DEA");

    // Truncate the history at the crossing bar; the scorer must read the
    // cross off its final two points.
    let result = TrendAnalyzer::new().analyze(&sym, &bars[..=cross_at]);
    assert!(matches!(
        result.macd_state,
        trendsig_core::MacdState::GoldenCross | trendsig_core::MacdState::GoldenCrossZero
    ));
    assert!(result.macd_signal.contains("golden cross"));
}

#[tokio::test]
async fn annotation_and_analysis_agree_on_moving_averages() {
    let sym = symbol("600519");
    let mut bars = bars_from_closes(&uptrend_closes(60, 0.002));

    trendsig_core::indicators::annotate_moving_averages(&mut bars);
    let result = TrendAnalyzer::new().analyze(&sym, &bars);

    let last = bars.last().expect("non-empty");
    assert_eq!(Some(result.ma5), last.ma5);
    assert_eq!(Some(result.ma10), last.ma10);
    assert_eq!(Some(result.ma20), last.ma20);
}

#[tokio::test]
async fn verdicts_are_reproducible() {
    let sym = symbol("600519");
    let closes: Vec<f64> = (0..90)
        .map(|i| 30.0 + (i as f64 * 0.31).sin() * 4.0)
        .collect();
    let bars = bars_from_closes(&closes);

    let analyzer = TrendAnalyzer::new();
    let first = analyzer.analyze(&sym, &bars);
    for _ in 0..5 {
        assert_eq!(analyzer.analyze(&sym, &bars), first);
    }
}
