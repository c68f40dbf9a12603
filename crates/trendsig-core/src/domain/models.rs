use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{SourceId, Symbol, ValidationError};

/// One trading day's OHLCV record for a symbol.
///
/// Histories are ordered ascending by date and hold at most one bar per
/// date; re-fetches overwrite, never duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Turnover amount in the quote currency, when the source reports it.
    pub amount: Option<f64>,
    /// Day-over-day percent change, when the source reports it.
    pub pct_chg: Option<f64>,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
}

impl DailyBar {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }
        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            amount: None,
            pct_chg: None,
            ma5: None,
            ma10: None,
            ma20: None,
        })
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_pct_chg(mut self, pct_chg: f64) -> Self {
        self.pct_chg = Some(pct_chg);
        self
    }
}

/// Real-time snapshot for a symbol. Ephemeral; superseded by the next fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub price: f64,
    pub volume_ratio: Option<f64>,
    pub turnover_rate: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub source: SourceId,
    #[serde(with = "time::serde::rfc3339")]
    pub as_of: OffsetDateTime,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: f64,
        source: SourceId,
        as_of: OffsetDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self {
            symbol,
            name: None,
            price,
            volume_ratio: None,
            turnover_rate: None,
            pe_ratio: None,
            pb_ratio: None,
            source,
            as_of,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A quote is usable once at least the traded price is present.
    pub fn has_basic_data(&self) -> bool {
        self.price > 0.0
    }
}

/// Holder cost/concentration snapshot ("chip distribution").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnershipDistribution {
    /// Share of holders currently in profit, in [0, 1].
    pub profit_ratio: f64,
    pub avg_cost: f64,
    /// Price-band width holding 90% of chips, in [0, 1].
    pub concentration_90: f64,
    /// Price-band width holding 70% of chips, in [0, 1].
    pub concentration_70: f64,
}

impl OwnershipDistribution {
    pub fn new(
        profit_ratio: f64,
        avg_cost: f64,
        concentration_90: f64,
        concentration_70: f64,
    ) -> Result<Self, ValidationError> {
        validate_ratio("profit_ratio", profit_ratio)?;
        validate_non_negative("avg_cost", avg_cost)?;
        validate_ratio("concentration_90", concentration_90)?;
        validate_ratio("concentration_70", concentration_70)?;
        Ok(Self {
            profit_ratio,
            avg_cost,
            concentration_90,
            concentration_70,
        })
    }
}

/// Market-wide index snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuote {
    pub name: String,
    pub last: f64,
    pub change_pct: f64,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_ratio(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::RatioOutOfRange { field, value });
    }
    Ok(())
}
