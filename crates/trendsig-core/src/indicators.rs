//! Technical indicator math.
//!
//! Pure functions over an ascending bar slice. Same input, same output,
//! bit for bit; nothing here touches a clock or an upstream source.
//!
//! - SMA windows 5/10/20/60; MA60 falls back to the MA20 series when fewer
//!   than 60 bars exist.
//! - MACD 12/26/9 with EMAs seeded at the first close, histogram
//!   `(DIF - DEA) * 2`.
//! - RSI 6/12/24 from rolling average gain/loss; undefined periods settle
//!   at the neutral 50, zero-loss windows saturate at 100.

use crate::DailyBar;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

pub const RSI_SHORT: usize = 6;
pub const RSI_MID: usize = 12;
pub const RSI_LONG: usize = 24;

/// Simple moving average; `None` until the window is full.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    out
}

/// Exponential moving average seeded at the first value,
/// `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut current = first;
    out.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// The four moving-average series used by trend analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverages {
    pub ma5: Vec<Option<f64>>,
    pub ma10: Vec<Option<f64>>,
    pub ma20: Vec<Option<f64>>,
    pub ma60: Vec<Option<f64>>,
}

pub fn moving_averages(closes: &[f64]) -> MovingAverages {
    let ma20 = sma(closes, 20);
    let ma60 = if closes.len() >= 60 {
        sma(closes, 60)
    } else {
        ma20.clone()
    };
    MovingAverages {
        ma5: sma(closes, 5),
        ma10: sma(closes, 10),
        ma20,
        ma60,
    }
}

/// MACD series, all aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(closes: &[f64]) -> Macd {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema(&dif, MACD_SIGNAL);
    let histogram: Vec<f64> = dif.iter().zip(&dea).map(|(d, e)| (d - e) * 2.0).collect();
    Macd {
        dif,
        dea,
        histogram,
    }
}

/// RSI over `period` trading days.
///
/// The first `period` entries have no full delta window and default to the
/// neutral 50. A window without losses saturates at 100, a flat window
/// (no gains either) stays neutral.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![50.0; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|pair| pair[1] - pair[0]).collect();

    for i in period..closes.len() {
        let window = &deltas[i - period..i];
        let gain: f64 = window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let loss: f64 = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

        out[i] = if loss == 0.0 {
            if gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            let rs = gain / loss;
            100.0 - 100.0 / (1.0 + rs)
        };
    }
    out
}

/// Everything the signal scorer needs, computed in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub mas: MovingAverages,
    pub macd: Macd,
    pub rsi6: Vec<f64>,
    pub rsi12: Vec<f64>,
    pub rsi24: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(bars: &[DailyBar]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        Self {
            mas: moving_averages(&closes),
            macd: macd(&closes),
            rsi6: rsi(&closes, RSI_SHORT),
            rsi12: rsi(&closes, RSI_MID),
            rsi24: rsi(&closes, RSI_LONG),
        }
    }
}

/// Fills the `ma5`/`ma10`/`ma20` slots on each bar in place.
pub fn annotate_moving_averages(bars: &mut [DailyBar]) {
    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let ma5 = sma(&closes, 5);
    let ma10 = sma(&closes, 10);
    let ma20 = sma(&closes, 20);
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.ma5 = ma5[i];
        bar.ma10 = ma10[i];
        bar.ma20 = ma20[i];
    }
}
