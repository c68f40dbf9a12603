//! Analysis verdict types.

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Moving-average alignment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendState {
    /// MA5 > MA10 > MA20 with the spread widening past 5%.
    StrongBull,
    /// MA5 > MA10 > MA20.
    Bull,
    /// MA5 > MA10 but MA10 <= MA20.
    WeakBull,
    /// Averages entangled, no direction.
    Consolidation,
    /// MA5 < MA10 but MA10 >= MA20.
    WeakBear,
    /// MA5 < MA10 < MA20.
    Bear,
    /// MA5 < MA10 < MA20 with the spread widening past 5%.
    StrongBear,
}

impl TrendState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBull => "strong bull",
            Self::Bull => "bull",
            Self::WeakBull => "weak bull",
            Self::Consolidation => "consolidation",
            Self::WeakBear => "weak bear",
            Self::Bear => "bear",
            Self::StrongBear => "strong bear",
        }
    }

    pub const fn is_bullish(self) -> bool {
        matches!(self, Self::StrongBull | Self::Bull | Self::WeakBull)
    }

    pub const fn is_bearish_alignment(self) -> bool {
        matches!(self, Self::Bear | Self::StrongBear)
    }
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volume relative to the trailing five-day average, with price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    HeavyVolumeUp,
    HeavyVolumeDown,
    ShrinkVolumeUp,
    /// Shrinking pullback, the preferred entry shape.
    ShrinkVolumeDown,
    Normal,
}

impl VolumeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeavyVolumeUp => "heavy volume up",
            Self::HeavyVolumeDown => "heavy volume down",
            Self::ShrinkVolumeUp => "shrinking volume up",
            Self::ShrinkVolumeDown => "shrinking pullback",
            Self::Normal => "normal volume",
        }
    }
}

impl std::fmt::Display for VolumeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MACD cross/position classification; crosses win over positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdState {
    /// DIF crossed above DEA while positive; the strongest entry signal.
    GoldenCrossZero,
    GoldenCross,
    CrossingUp,
    Bullish,
    Bearish,
    CrossingDown,
    DeathCross,
}

impl MacdState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GoldenCrossZero => "golden cross above zero",
            Self::GoldenCross => "golden cross",
            Self::CrossingUp => "crossing up through zero",
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::CrossingDown => "crossing down through zero",
            Self::DeathCross => "death cross",
        }
    }
}

impl std::fmt::Display for MacdState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RSI(12) band classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiState {
    /// RSI > 70.
    Overbought,
    /// 60 < RSI <= 70.
    Strong,
    /// 40 <= RSI <= 60.
    Neutral,
    /// 30 <= RSI < 40.
    Weak,
    /// RSI < 30.
    Oversold,
}

impl RsiState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overbought => "overbought",
            Self::Strong => "strong",
            Self::Neutral => "neutral",
            Self::Weak => "weak",
            Self::Oversold => "oversold",
        }
    }
}

impl std::fmt::Display for RsiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final discrete verdict derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuySignal {
    StrongBuy,
    Buy,
    Hold,
    Wait,
    Sell,
    StrongSell,
}

impl BuySignal {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "strong buy",
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Wait => "wait",
            Self::Sell => "sell",
            Self::StrongSell => "strong sell",
        }
    }

    pub const fn is_buy(self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }
}

impl std::fmt::Display for BuySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete analysis verdict for one symbol.
///
/// Built once per run by [`TrendAnalyzer`](super::TrendAnalyzer) and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub symbol: Symbol,

    pub trend_state: TrendState,
    pub ma_alignment: String,
    /// Trend strength 0-100.
    pub trend_strength: f64,

    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma60: f64,
    pub current_price: f64,

    /// (close - MA) / MA * 100.
    pub bias_ma5: f64,
    pub bias_ma10: f64,
    pub bias_ma20: f64,

    pub volume_state: VolumeState,
    /// Latest volume over the trailing five-day average.
    pub volume_ratio_5d: f64,
    pub volume_trend: String,

    pub support_ma5: bool,
    pub support_ma10: bool,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,

    pub macd_dif: f64,
    pub macd_dea: f64,
    pub macd_bar: f64,
    pub macd_state: MacdState,
    pub macd_signal: String,

    pub rsi_6: f64,
    pub rsi_12: f64,
    pub rsi_24: f64,
    pub rsi_state: RsiState,
    pub rsi_signal: String,

    pub buy_signal: BuySignal,
    /// Composite 0-100.
    pub signal_score: u32,
    pub signal_reasons: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl TrendResult {
    pub(crate) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            trend_state: TrendState::Consolidation,
            ma_alignment: String::new(),
            trend_strength: 0.0,
            ma5: 0.0,
            ma10: 0.0,
            ma20: 0.0,
            ma60: 0.0,
            current_price: 0.0,
            bias_ma5: 0.0,
            bias_ma10: 0.0,
            bias_ma20: 0.0,
            volume_state: VolumeState::Normal,
            volume_ratio_5d: 0.0,
            volume_trend: String::new(),
            support_ma5: false,
            support_ma10: false,
            support_levels: Vec::new(),
            resistance_levels: Vec::new(),
            macd_dif: 0.0,
            macd_dea: 0.0,
            macd_bar: 0.0,
            macd_state: MacdState::Bullish,
            macd_signal: String::new(),
            rsi_6: 0.0,
            rsi_12: 0.0,
            rsi_24: 0.0,
            rsi_state: RsiState::Neutral,
            rsi_signal: String::new(),
            buy_signal: BuySignal::Wait,
            signal_score: 0,
            signal_reasons: Vec::new(),
            risk_factors: Vec::new(),
        }
    }
}
