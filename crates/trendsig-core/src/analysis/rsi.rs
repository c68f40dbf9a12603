//! RSI state classification; the 12-period value decides the band.

use crate::indicators::{IndicatorSet, RSI_LONG};

use super::result::{RsiState, TrendResult};

const OVERBOUGHT: f64 = 70.0;
const OVERSOLD: f64 = 30.0;

pub(super) fn analyze(indicators: &IndicatorSet, result: &mut TrendResult) {
    let len = indicators.rsi12.len();
    if len < RSI_LONG {
        result.rsi_signal = "insufficient history for RSI".to_owned();
        return;
    }

    result.rsi_6 = indicators.rsi6[len - 1];
    result.rsi_12 = indicators.rsi12[len - 1];
    result.rsi_24 = indicators.rsi24[len - 1];

    let rsi = result.rsi_12;
    if rsi > OVERBOUGHT {
        result.rsi_state = RsiState::Overbought;
        result.rsi_signal = format!("RSI overbought ({rsi:.1} > 70), pullback risk is high");
    } else if rsi > 60.0 {
        result.rsi_state = RsiState::Strong;
        result.rsi_signal = format!("RSI strong ({rsi:.1}), buyers well supplied");
    } else if rsi >= 40.0 {
        result.rsi_state = RsiState::Neutral;
        result.rsi_signal = format!("RSI neutral ({rsi:.1}), ranging");
    } else if rsi >= OVERSOLD {
        result.rsi_state = RsiState::Weak;
        result.rsi_signal = format!("RSI weak ({rsi:.1}), watch for a bounce");
    } else {
        result.rsi_state = RsiState::Oversold;
        result.rsi_signal = format!("RSI oversold ({rsi:.1} < 30), bounce odds favorable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators;
    use crate::Symbol;

    fn classify(closes: &[f64]) -> (RsiState, f64) {
        let bars: Vec<crate::DailyBar> = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let date = time::Date::from_julian_day(2_460_000 + i as i32).expect("valid date");
                crate::DailyBar::new(date, *close, close + 1.0, close - 1.0, *close, 1_000.0)
                    .expect("valid bar")
            })
            .collect();
        let set = indicators::IndicatorSet::compute(&bars);
        let mut result = TrendResult::new(Symbol::parse("600519").expect("valid"));
        analyze(&set, &mut result);
        (result.rsi_state, result.rsi_12)
    }

    #[test]
    fn relentless_rally_reads_overbought() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64 * 0.5).collect();
        let (state, rsi) = classify(&closes);
        assert_eq!(state, RsiState::Overbought);
        assert_eq!(rsi, 100.0);
    }

    #[test]
    fn flat_closes_read_neutral() {
        let closes = vec![10.0; 30];
        let (state, rsi) = classify(&closes);
        assert_eq!(state, RsiState::Neutral);
        assert_eq!(rsi, 50.0);
    }

    #[test]
    fn relentless_slide_reads_oversold() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 - i as f64 * 0.5).collect();
        let (state, _) = classify(&closes);
        assert_eq!(state, RsiState::Oversold);
    }
}
