//! Trend, bias, volume, and support classification.
//!
//! Encodes a tight-entry playbook: trade only with an MA5>MA10>MA20
//! alignment, never chase a close stretched more than 5% over MA5, and
//! prefer a shrinking-volume pullback onto MA5/MA10 support.

use crate::indicators::MovingAverages;
use crate::DailyBar;

use super::result::{TrendResult, TrendState, VolumeState};

pub(super) const BIAS_THRESHOLD: f64 = 5.0;
const VOLUME_SHRINK_RATIO: f64 = 0.7;
const VOLUME_HEAVY_RATIO: f64 = 1.5;
const MA_SUPPORT_TOLERANCE: f64 = 0.02;
/// Spread widening beyond this percentage marks a strong trend.
const STRONG_SPREAD_PCT: f64 = 5.0;

/// One-line moving-average posture for report headers.
pub fn ma_status(close: f64, ma5: f64, ma10: f64, ma20: f64) -> &'static str {
    if close > ma5 && ma5 > ma10 && ma10 > ma20 && ma20 > 0.0 {
        "bullish alignment"
    } else if close < ma5 && ma5 < ma10 && ma10 < ma20 && ma20 > 0.0 {
        "bearish alignment"
    } else if close > ma5 && ma5 > ma10 {
        "short-term improving"
    } else if close < ma5 && ma5 < ma10 {
        "short-term weakening"
    } else {
        "consolidating"
    }
}

fn spread_pct(high: f64, low: f64) -> f64 {
    if low > 0.0 {
        (high - low) / low * 100.0
    } else {
        0.0
    }
}

pub(super) fn analyze_trend(mas: &MovingAverages, result: &mut TrendResult) {
    let (ma5, ma10, ma20) = (result.ma5, result.ma10, result.ma20);
    let len = mas.ma5.len();

    // Spread measured against five bars ago decides strong vs plain.
    let prev_index = if len >= 5 { len - 5 } else { len - 1 };
    let prev_ma5 = mas.ma5[prev_index];
    let prev_ma20 = mas.ma20[prev_index];

    if ma5 > ma10 && ma10 > ma20 {
        let curr_spread = spread_pct(ma5, ma20);
        let widening = match (prev_ma5, prev_ma20) {
            (Some(p5), Some(p20)) => curr_spread > spread_pct(p5, p20),
            _ => false,
        };

        if widening && curr_spread > STRONG_SPREAD_PCT {
            result.trend_state = TrendState::StrongBull;
            result.ma_alignment = "strong bullish alignment, averages fanning upward".to_owned();
            result.trend_strength = 90.0;
        } else {
            result.trend_state = TrendState::Bull;
            result.ma_alignment = "bullish alignment MA5>MA10>MA20".to_owned();
            result.trend_strength = 75.0;
        }
    } else if ma5 > ma10 && ma10 <= ma20 {
        result.trend_state = TrendState::WeakBull;
        result.ma_alignment = "weak bull, MA5>MA10 but MA10<=MA20".to_owned();
        result.trend_strength = 55.0;
    } else if ma5 < ma10 && ma10 < ma20 {
        let curr_spread = spread_pct(ma20, ma5);
        let widening = match (prev_ma5, prev_ma20) {
            (Some(p5), Some(p20)) => curr_spread > spread_pct(p20, p5),
            _ => false,
        };

        if widening && curr_spread > STRONG_SPREAD_PCT {
            result.trend_state = TrendState::StrongBear;
            result.ma_alignment = "strong bearish alignment, averages fanning downward".to_owned();
            result.trend_strength = 10.0;
        } else {
            result.trend_state = TrendState::Bear;
            result.ma_alignment = "bearish alignment MA5<MA10<MA20".to_owned();
            result.trend_strength = 25.0;
        }
    } else if ma5 < ma10 && ma10 >= ma20 {
        result.trend_state = TrendState::WeakBear;
        result.ma_alignment = "weak bear, MA5<MA10 but MA10>=MA20".to_owned();
        result.trend_strength = 40.0;
    } else {
        result.trend_state = TrendState::Consolidation;
        result.ma_alignment = "averages entangled, no clear trend".to_owned();
        result.trend_strength = 50.0;
    }
}

pub(super) fn calculate_bias(result: &mut TrendResult) {
    let price = result.current_price;
    if result.ma5 > 0.0 {
        result.bias_ma5 = (price - result.ma5) / result.ma5 * 100.0;
    }
    if result.ma10 > 0.0 {
        result.bias_ma10 = (price - result.ma10) / result.ma10 * 100.0;
    }
    if result.ma20 > 0.0 {
        result.bias_ma20 = (price - result.ma20) / result.ma20 * 100.0;
    }
}

pub(super) fn analyze_volume(bars: &[DailyBar], result: &mut TrendResult) {
    if bars.len() < 5 {
        return;
    }

    let latest = &bars[bars.len() - 1];
    let window_start = bars.len().saturating_sub(6);
    let window = &bars[window_start..bars.len() - 1];
    let avg_5d = window.iter().map(|bar| bar.volume).sum::<f64>() / window.len() as f64;

    if avg_5d > 0.0 {
        result.volume_ratio_5d = latest.volume / avg_5d;
    }

    let prev_close = bars[bars.len() - 2].close;
    let price_change = (latest.close - prev_close) / prev_close * 100.0;

    if result.volume_ratio_5d >= VOLUME_HEAVY_RATIO {
        if price_change > 0.0 {
            result.volume_state = VolumeState::HeavyVolumeUp;
            result.volume_trend = "heavy volume advance, buyers in force".to_owned();
        } else {
            result.volume_state = VolumeState::HeavyVolumeDown;
            result.volume_trend = "heavy volume decline, caution".to_owned();
        }
    } else if result.volume_ratio_5d <= VOLUME_SHRINK_RATIO {
        if price_change > 0.0 {
            result.volume_state = VolumeState::ShrinkVolumeUp;
            result.volume_trend = "advance on shrinking volume, little fuel".to_owned();
        } else {
            result.volume_state = VolumeState::ShrinkVolumeDown;
            result.volume_trend = "shrinking-volume pullback, classic shakeout".to_owned();
        }
    } else {
        result.volume_state = VolumeState::Normal;
        result.volume_trend = "volume in normal range".to_owned();
    }
}

pub(super) fn analyze_support_resistance(bars: &[DailyBar], result: &mut TrendResult) {
    let price = result.current_price;

    if result.ma5 > 0.0 {
        let distance = (price - result.ma5).abs() / result.ma5;
        if distance <= MA_SUPPORT_TOLERANCE && price >= result.ma5 {
            result.support_ma5 = true;
            result.support_levels.push(result.ma5);
        }
    }

    if result.ma10 > 0.0 {
        let distance = (price - result.ma10).abs() / result.ma10;
        if distance <= MA_SUPPORT_TOLERANCE && price >= result.ma10 {
            result.support_ma10 = true;
            if !result.support_levels.contains(&result.ma10) {
                result.support_levels.push(result.ma10);
            }
        }
    }

    if result.ma20 > 0.0 && price >= result.ma20 {
        result.support_levels.push(result.ma20);
    }

    if bars.len() >= 20 {
        let recent_high = bars[bars.len() - 20..]
            .iter()
            .map(|bar| bar.high)
            .fold(f64::MIN, f64::max);
        if recent_high > price {
            result.resistance_levels.push(recent_high);
        }
    }
}
