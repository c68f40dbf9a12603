//! Tushare Pro adapter.
//!
//! Token-authenticated JSON-RPC-ish API: every call POSTs an `api_name`
//! plus params and gets back a columnar `fields`/`items` table. Rows are
//! re-keyed by column name before normalization so field order changes
//! upstream cannot silently shift values.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::data_source::{BarsRequest, CapabilitySet, Endpoint, FetchError, MarketDataSource};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol};

const API_URL: &str = "http://api.tushare.pro";

const TRADE_DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year][month][day]");

fn ts_code(symbol: &Symbol) -> String {
    let suffix = if symbol.as_str().starts_with('6') { "SH" } else { "SZ" };
    format!("{}.{suffix}", symbol.as_str())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    msg: Option<String>,
    data: Option<ApiTable>,
}

#[derive(Debug, Deserialize)]
struct ApiTable {
    fields: Vec<String>,
    items: Vec<Vec<Value>>,
}

/// One row of a columnar response, addressable by field name.
struct Row<'a> {
    fields: &'a [String],
    values: &'a [Value],
}

impl Row<'_> {
    fn f64(&self, field: &str) -> Result<f64, FetchError> {
        self.value(field)?
            .as_f64()
            .ok_or_else(|| FetchError::parse(format!("tushare field '{field}' is not numeric")))
    }

    fn str(&self, field: &str) -> Result<&str, FetchError> {
        self.value(field)?
            .as_str()
            .ok_or_else(|| FetchError::parse(format!("tushare field '{field}' is not a string")))
    }

    fn value(&self, field: &str) -> Result<&Value, FetchError> {
        let index = self
            .fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| FetchError::parse(format!("tushare response lacks field '{field}'")))?;
        self.values
            .get(index)
            .ok_or_else(|| FetchError::parse(format!("tushare row is short of field '{field}'")))
    }
}

/// Tushare Pro adapter; CN fallback source.
#[derive(Clone)]
pub struct TushareAdapter {
    http_client: Arc<dyn HttpClient>,
    token: String,
}

impl TushareAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: token.into(),
        }
    }

    async fn call(
        &self,
        api_name: &str,
        params: Value,
        fields: &str,
    ) -> Result<ApiTable, FetchError> {
        let body = json!({
            "api_name": api_name,
            "token": self.token,
            "params": params,
            "fields": fields,
        });
        let request = HttpRequest::post(API_URL)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FetchError::upstream_status(response.status));
        }

        let parsed: ApiResponse = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::parse(format!("tushare {api_name} payload: {e}")))?;
        if parsed.code != 0 {
            return Err(FetchError::no_data(format!(
                "tushare {api_name} answered code {}: {}",
                parsed.code,
                parsed.msg.unwrap_or_default()
            )));
        }
        parsed
            .data
            .ok_or_else(|| FetchError::no_data(format!("tushare {api_name} payload was empty")))
    }
}

impl MarketDataSource for TushareAdapter {
    fn id(&self) -> SourceId {
        SourceId::Tushare
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, true, true, false)
    }

    fn daily_bars<'a>(
        &'a self,
        req: BarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let table = self
                .call(
                    "daily",
                    json!({ "ts_code": ts_code(&req.symbol) }),
                    "trade_date,open,high,low,close,vol,amount,pct_chg",
                )
                .await?;

            let mut bars = Vec::with_capacity(table.items.len().min(req.limit));
            for values in &table.items {
                let row = Row {
                    fields: &table.fields,
                    values,
                };
                let raw_date = row.str("trade_date")?;
                let date = Date::parse(raw_date, TRADE_DATE_FORMAT).map_err(|e| {
                    FetchError::parse(format!("tushare trade_date '{raw_date}': {e}"))
                })?;
                let bar = DailyBar::new(
                    date,
                    row.f64("open")?,
                    row.f64("high")?,
                    row.f64("low")?,
                    row.f64("close")?,
                    row.f64("vol")?,
                )
                .map_err(|e| FetchError::parse(format!("tushare daily row: {e}")))?
                .with_amount(row.f64("amount")?)
                .with_pct_chg(row.f64("pct_chg")?);
                bars.push(bar);
            }

            if bars.is_empty() {
                return Err(FetchError::no_data(format!(
                    "tushare answered zero bars for {}",
                    req.symbol
                )));
            }

            // Tushare answers newest-first; histories are ascending.
            bars.sort_by_key(|bar| bar.date);
            if bars.len() > req.limit {
                bars.drain(..bars.len() - req.limit);
            }
            Ok(bars)
        })
    }

    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Quote, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let table = self
                .call(
                    "realtime_quote",
                    json!({ "ts_code": ts_code(symbol) }),
                    "name,price",
                )
                .await?;
            let values = table.items.first().ok_or_else(|| {
                FetchError::no_data(format!("tushare has no realtime quote for {symbol}"))
            })?;
            let row = Row {
                fields: &table.fields,
                values,
            };

            let quote = Quote::new(
                symbol.clone(),
                row.f64("price")?,
                SourceId::Tushare,
                OffsetDateTime::now_utc(),
            )
            .map_err(|e| FetchError::parse(format!("tushare quote row: {e}")))?
            .with_name(row.str("name")?.to_owned());
            Ok(quote)
        })
    }

    fn ownership<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<OwnershipDistribution, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let table = self
                .call(
                    "cyq_perf",
                    json!({ "ts_code": ts_code(symbol) }),
                    "weight_avg,winner_rate,cost_5pct,cost_15pct,cost_85pct,cost_95pct",
                )
                .await?;
            let values = table.items.first().ok_or_else(|| {
                FetchError::no_data(format!("tushare has no chip data for {symbol}"))
            })?;
            let row = Row {
                fields: &table.fields,
                values,
            };

            let cost_5 = row.f64("cost_5pct")?;
            let cost_15 = row.f64("cost_15pct")?;
            let cost_85 = row.f64("cost_85pct")?;
            let cost_95 = row.f64("cost_95pct")?;

            OwnershipDistribution::new(
                row.f64("winner_rate")? / 100.0,
                row.f64("weight_avg")?,
                concentration(cost_5, cost_95)?,
                concentration(cost_15, cost_85)?,
            )
            .map_err(|e| FetchError::parse(format!("tushare chip row: {e}")))
        })
    }

    fn display_name<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let table = self
                .call(
                    "stock_basic",
                    json!({ "ts_code": ts_code(symbol) }),
                    "name",
                )
                .await?;
            let values = table.items.first().ok_or_else(|| {
                FetchError::no_data(format!("tushare has no listing row for {symbol}"))
            })?;
            let row = Row {
                fields: &table.fields,
                values,
            };
            Ok(row.str("name")?.to_owned())
        })
    }

    fn market_indices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexQuote>, FetchError>> + Send + 'a>> {
        Box::pin(async move { Err(FetchError::unsupported_endpoint(Endpoint::MarketIndices)) })
    }
}

/// Chip concentration over a cost band, in [0, 1].
fn concentration(low_cost: f64, high_cost: f64) -> Result<f64, FetchError> {
    let denominator = high_cost + low_cost;
    if denominator <= 0.0 {
        return Err(FetchError::parse("tushare cost band is not positive"));
    }
    Ok(((high_cost - low_cost) / denominator).clamp(0.0, 1.0))
}

impl std::fmt::Debug for TushareAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TushareAdapter").finish_non_exhaustive()
    }
}
