//! Composite scoring and the discrete buy signal.
//!
//! Weights: trend 30, bias 20, volume 15, support 10, MACD 15, RSI 10.
//! Every branch awards a fixed integer so two runs over the same bars can
//! never disagree.

use super::result::{BuySignal, MacdState, RsiState, TrendResult, TrendState, VolumeState};
use super::trend::BIAS_THRESHOLD;

const fn trend_score(state: TrendState) -> u32 {
    match state {
        TrendState::StrongBull => 30,
        TrendState::Bull => 26,
        TrendState::WeakBull => 18,
        TrendState::Consolidation => 12,
        TrendState::WeakBear => 8,
        TrendState::Bear => 4,
        TrendState::StrongBear => 0,
    }
}

const fn volume_score(state: VolumeState) -> u32 {
    match state {
        // A shrinking pullback is the preferred entry shape.
        VolumeState::ShrinkVolumeDown => 15,
        VolumeState::HeavyVolumeUp => 12,
        VolumeState::Normal => 10,
        VolumeState::ShrinkVolumeUp => 6,
        VolumeState::HeavyVolumeDown => 0,
    }
}

const fn macd_score(state: MacdState) -> u32 {
    match state {
        MacdState::GoldenCrossZero => 15,
        MacdState::GoldenCross => 12,
        MacdState::CrossingUp => 10,
        MacdState::Bullish => 8,
        MacdState::Bearish => 2,
        MacdState::CrossingDown | MacdState::DeathCross => 0,
    }
}

const fn rsi_score(state: RsiState) -> u32 {
    match state {
        RsiState::Oversold => 10,
        RsiState::Strong => 8,
        RsiState::Neutral => 5,
        RsiState::Weak => 3,
        RsiState::Overbought => 0,
    }
}

pub(super) fn generate(result: &mut TrendResult) {
    let mut score = 0u32;
    let mut reasons = Vec::new();
    let mut risks = Vec::new();

    score += trend_score(result.trend_state);
    match result.trend_state {
        TrendState::StrongBull | TrendState::Bull => {
            reasons.push(format!("{}, trade with the trend", result.trend_state));
        }
        TrendState::Bear | TrendState::StrongBear => {
            risks.push(format!("{}, no long entries", result.trend_state));
        }
        _ => {}
    }

    let bias = result.bias_ma5;
    if bias < 0.0 {
        // Close sits under MA5: a pullback, graded by depth.
        if bias > -3.0 {
            score += 20;
            reasons.push(format!("close slightly under MA5 ({bias:.1}%), pullback entry"));
        } else if bias > -5.0 {
            score += 16;
            reasons.push(format!("close testing MA5 ({bias:.1}%), watch the hold"));
        } else {
            score += 8;
            risks.push(format!("bias too deep ({bias:.1}%), possible breakdown"));
        }
    } else if bias < 2.0 {
        score += 18;
        reasons.push(format!("close hugging MA5 ({bias:.1}%), good entry window"));
    } else if bias < BIAS_THRESHOLD {
        score += 14;
        reasons.push(format!("close slightly over MA5 ({bias:.1}%), small size only"));
    } else {
        score += 4;
        risks.push(format!("bias too high ({bias:.1}% > 5%), do not chase"));
    }

    score += volume_score(result.volume_state);
    match result.volume_state {
        VolumeState::ShrinkVolumeDown => {
            reasons.push("shrinking-volume pullback, holders sitting tight".to_owned());
        }
        VolumeState::HeavyVolumeDown => {
            risks.push("heavy volume decline, caution".to_owned());
        }
        _ => {}
    }

    if result.support_ma5 {
        score += 5;
        reasons.push("MA5 support holding".to_owned());
    }
    if result.support_ma10 {
        score += 5;
        reasons.push("MA10 support holding".to_owned());
    }

    score += macd_score(result.macd_state);
    match result.macd_state {
        MacdState::GoldenCrossZero | MacdState::GoldenCross => {
            reasons.push(result.macd_signal.clone());
        }
        MacdState::DeathCross | MacdState::CrossingDown => {
            risks.push(result.macd_signal.clone());
        }
        _ => reasons.push(result.macd_signal.clone()),
    }

    score += rsi_score(result.rsi_state);
    match result.rsi_state {
        RsiState::Oversold | RsiState::Strong => reasons.push(result.rsi_signal.clone()),
        RsiState::Overbought => risks.push(result.rsi_signal.clone()),
        _ => reasons.push(result.rsi_signal.clone()),
    }

    result.signal_score = score;
    result.signal_reasons = reasons;
    result.risk_factors = risks;

    result.buy_signal = if score >= 75
        && matches!(result.trend_state, TrendState::StrongBull | TrendState::Bull)
    {
        BuySignal::StrongBuy
    } else if score >= 60 && result.trend_state.is_bullish() {
        BuySignal::Buy
    } else if score >= 45 {
        BuySignal::Hold
    } else if score >= 30 {
        BuySignal::Wait
    } else if result.trend_state.is_bearish_alignment() {
        BuySignal::StrongSell
    } else {
        BuySignal::Sell
    };
}
