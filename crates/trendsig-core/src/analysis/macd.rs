//! MACD state classification.

use crate::indicators::{Macd, MACD_SLOW};

use super::result::{MacdState, TrendResult};

/// Classifies the latest MACD posture. Cross events are checked before
/// zero-line crossings, which are checked before plain positions, so the
/// strongest reading at the latest bar wins.
pub(super) fn analyze(series: &Macd, result: &mut TrendResult) {
    let len = series.dif.len();
    if len < MACD_SLOW {
        result.macd_signal = "insufficient history for MACD".to_owned();
        return;
    }

    let dif = series.dif[len - 1];
    let dea = series.dea[len - 1];
    let prev_dif = series.dif[len - 2];
    let prev_dea = series.dea[len - 2];

    result.macd_dif = dif;
    result.macd_dea = dea;
    result.macd_bar = series.histogram[len - 1];

    if prev_dif <= prev_dea && dif > dea {
        if dif > 0.0 {
            result.macd_state = MacdState::GoldenCrossZero;
            result.macd_signal =
                format!("golden cross above zero (DIF {dif:.3} > DEA {dea:.3}), strong buy setup");
        } else {
            result.macd_state = MacdState::GoldenCross;
            result.macd_signal = format!("golden cross (DIF {dif:.3} > DEA {dea:.3})");
        }
    } else if prev_dif >= prev_dea && dif < dea {
        result.macd_state = MacdState::DeathCross;
        result.macd_signal = format!("death cross (DIF {dif:.3} < DEA {dea:.3})");
    } else if prev_dif <= 0.0 && dif > 0.0 {
        result.macd_state = MacdState::CrossingUp;
        result.macd_signal = format!("DIF crossing up through zero ({dif:.3})");
    } else if prev_dif >= 0.0 && dif < 0.0 {
        result.macd_state = MacdState::CrossingDown;
        result.macd_signal = format!("DIF crossing down through zero ({dif:.3})");
    } else if dif > dea {
        result.macd_state = MacdState::Bullish;
        result.macd_signal = format!("bullish (DIF {dif:.3} > DEA {dea:.3})");
    } else {
        result.macd_state = MacdState::Bearish;
        result.macd_signal = format!("bearish (DIF {dif:.3} <= DEA {dea:.3})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn series(dif: Vec<f64>, dea: Vec<f64>) -> Macd {
        let histogram = dif.iter().zip(&dea).map(|(d, e)| (d - e) * 2.0).collect();
        Macd {
            dif,
            dea,
            histogram,
        }
    }

    fn classify(dif_tail: [f64; 2], dea_tail: [f64; 2]) -> MacdState {
        let mut dif = vec![0.0; 28];
        dif.extend(dif_tail);
        let mut dea = vec![0.0; 28];
        dea.extend(dea_tail);
        let mut result = TrendResult::new(Symbol::parse("600519").expect("valid"));
        analyze(&series(dif, dea), &mut result);
        result.macd_state
    }

    #[test]
    fn golden_cross_below_zero_stays_plain() {
        assert_eq!(classify([-0.5, -0.1], [-0.3, -0.3]), MacdState::GoldenCross);
    }

    #[test]
    fn golden_cross_above_zero_is_strongest() {
        assert_eq!(
            classify([0.3, 0.8], [0.5, 0.5]),
            MacdState::GoldenCrossZero
        );
    }

    #[test]
    fn death_cross_beats_zero_crossing() {
        assert_eq!(classify([0.5, -0.5], [0.0, 0.0]), MacdState::DeathCross);
    }

    #[test]
    fn zero_line_crossings_without_crosses() {
        assert_eq!(classify([-0.5, 0.5], [-0.8, -0.8]), MacdState::CrossingUp);
        assert_eq!(classify([0.5, -0.5], [0.8, 0.8]), MacdState::CrossingDown);
    }

    #[test]
    fn plain_positions_fall_through() {
        assert_eq!(classify([0.8, 0.8], [0.5, 0.5]), MacdState::Bullish);
        assert_eq!(classify([-0.8, -0.8], [-0.5, -0.5]), MacdState::Bearish);
        // DIF exactly on zero, above DEA, no cross.
        assert_eq!(classify([0.0, 0.0], [-0.1, -0.1]), MacdState::Bullish);
    }

    #[test]
    fn short_history_is_flagged() {
        let mut result = TrendResult::new(Symbol::parse("600519").expect("valid"));
        analyze(&series(vec![0.0; 10], vec![0.0; 10]), &mut result);
        assert!(result.macd_signal.contains("insufficient"));
    }
}
