//! Deterministic multi-indicator signal scoring.
//!
//! [`TrendAnalyzer::analyze`] turns an ascending daily-bar history into a
//! [`TrendResult`]: trend/bias/volume/support classification, MACD and RSI
//! states, a 0-100 composite score, and the discrete buy signal. No I/O,
//! no clock; the same bars always produce the same verdict.

mod macd;
mod result;
mod rsi;
mod score;
mod trend;

pub use result::{BuySignal, MacdState, RsiState, TrendResult, TrendState, VolumeState};
pub use trend::ma_status;

use crate::indicators::IndicatorSet;
use crate::{DailyBar, Symbol};

/// Minimum history for a meaningful verdict.
const MIN_BARS: usize = 20;

/// Signal scorer over a daily-bar history.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes an ascending bar history for `symbol`.
    ///
    /// Fewer than 20 bars yields a neutral result carrying an explanatory
    /// risk factor instead of an error; a missing verdict must not sink a
    /// batch run.
    pub fn analyze(&self, symbol: &Symbol, bars: &[DailyBar]) -> TrendResult {
        let mut result = TrendResult::new(symbol.clone());

        if bars.len() < MIN_BARS {
            result
                .risk_factors
                .push("insufficient history, analysis skipped".to_owned());
            return result;
        }

        let indicators = IndicatorSet::compute(bars);
        let last = bars.len() - 1;

        result.current_price = bars[last].close;
        result.ma5 = indicators.mas.ma5[last].unwrap_or(0.0);
        result.ma10 = indicators.mas.ma10[last].unwrap_or(0.0);
        result.ma20 = indicators.mas.ma20[last].unwrap_or(0.0);
        result.ma60 = indicators.mas.ma60[last].unwrap_or(0.0);

        trend::analyze_trend(&indicators.mas, &mut result);
        trend::calculate_bias(&mut result);
        trend::analyze_volume(bars, &mut result);
        trend::analyze_support_resistance(bars, &mut result);
        macd::analyze(&indicators.macd, &mut result);
        rsi::analyze(&indicators, &mut result);
        score::generate(&mut result);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from_closes(closes: &[f64]) -> Vec<DailyBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let date = time::Date::from_julian_day(2_460_000 + i as i32).expect("valid date");
                DailyBar::new(
                    date,
                    *close,
                    close * 1.01,
                    close * 0.99,
                    *close,
                    1_000_000.0,
                )
                .expect("valid bar")
            })
            .collect()
    }

    #[test]
    fn short_history_degrades_instead_of_failing() {
        let symbol = Symbol::parse("600519").expect("valid");
        let bars = bars_from_closes(&[10.0; 10]);

        let result = TrendAnalyzer::new().analyze(&symbol, &bars);
        assert_eq!(result.trend_state, TrendState::Consolidation);
        assert_eq!(result.signal_score, 0);
        assert!(result.risk_factors[0].contains("insufficient history"));
    }

    #[test]
    fn steady_uptrend_aligns_bullish() {
        let symbol = Symbol::parse("600519").expect("valid");
        let closes: Vec<f64> = (0..60).map(|i| 10.0 * 1.003_f64.powi(i)).collect();
        let bars = bars_from_closes(&closes);

        let result = TrendAnalyzer::new().analyze(&symbol, &bars);
        assert!(result.ma5 > result.ma10 && result.ma10 > result.ma20);
        assert!(matches!(
            result.trend_state,
            TrendState::Bull | TrendState::StrongBull
        ));
        assert!(result.buy_signal.is_buy() || result.buy_signal == BuySignal::Hold);
    }

    #[test]
    fn same_bars_same_verdict() {
        let symbol = Symbol::parse("600519").expect("valid");
        let closes: Vec<f64> = (0..60)
            .map(|i| 10.0 + (i as f64 * 0.9).sin() * 0.8)
            .collect();
        let bars = bars_from_closes(&closes);

        let analyzer = TrendAnalyzer::new();
        let first = analyzer.analyze(&symbol, &bars);
        let second = analyzer.analyze(&symbol, &bars);
        assert_eq!(first, second);
    }
}
