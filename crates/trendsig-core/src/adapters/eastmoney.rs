//! Eastmoney (push2) adapter.
//!
//! Primary source for CN symbols. Quote lookups ride on a whole-market
//! snapshot pulled in one request and cached inside the adapter, which is
//! what makes batch prefetching worthwhile.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::data_source::{BarsRequest, CapabilitySet, FetchError, MarketDataSource};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol};

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const SNAPSHOT_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";
const CHIP_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/chip/get";
const INDICES_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";

/// CN codes beginning with 6 trade on Shanghai (market 1), the rest on
/// Shenzhen (market 0).
fn secid(symbol: &Symbol) -> String {
    let market = if symbol.as_str().starts_with('6') { 1 } else { 0 };
    format!("{market}.{}", symbol.as_str())
}

#[derive(Debug, Clone)]
struct SnapshotRow {
    name: String,
    price: f64,
    volume_ratio: Option<f64>,
    turnover_rate: Option<f64>,
    pe_ratio: Option<f64>,
    pb_ratio: Option<f64>,
}

struct Snapshot {
    fetched_at: Instant,
    rows: HashMap<String, SnapshotRow>,
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Option<ListData>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    diff: Vec<ListRow>,
}

#[derive(Debug, Deserialize)]
struct ListRow {
    #[serde(rename = "f2")]
    price: Option<f64>,
    #[serde(rename = "f3")]
    change_pct: Option<f64>,
    #[serde(rename = "f8")]
    turnover_rate: Option<f64>,
    #[serde(rename = "f9")]
    pe_ratio: Option<f64>,
    #[serde(rename = "f10")]
    volume_ratio: Option<f64>,
    #[serde(rename = "f12")]
    code: Option<String>,
    #[serde(rename = "f14")]
    name: Option<String>,
    #[serde(rename = "f23")]
    pb_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChipResponse {
    data: Option<ChipData>,
}

#[derive(Debug, Deserialize)]
struct ChipData {
    #[serde(rename = "profitRatio")]
    profit_ratio: f64,
    #[serde(rename = "avgCost")]
    avg_cost: f64,
    #[serde(rename = "concentration90")]
    concentration_90: f64,
    #[serde(rename = "concentration70")]
    concentration_70: f64,
}

/// Eastmoney adapter; highest-priority CN source.
#[derive(Clone)]
pub struct EastmoneyAdapter {
    http_client: Arc<dyn HttpClient>,
    snapshot: Arc<tokio::sync::RwLock<Option<Arc<Snapshot>>>>,
    snapshot_ttl: Duration,
}

impl EastmoneyAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            snapshot: Arc::new(tokio::sync::RwLock::new(None)),
            snapshot_ttl: Duration::from_secs(60),
        }
    }

    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Fetches the whole-market snapshot, reusing the cached pull while it
    /// is fresh. One call serves every symbol in a batch run.
    async fn market_snapshot(&self) -> Result<Arc<Snapshot>, FetchError> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.fetched_at.elapsed() < self.snapshot_ttl {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        let url = format!(
            "{SNAPSHOT_URL}?pn=1&pz=6000&fs={}&fields=f2,f3,f8,f9,f10,f12,f14,f23",
            urlencoding::encode("m:0+t:6,m:0+t:80,m:1+t:2,m:1+t:23"),
        );
        let response = self
            .http_client
            .execute(HttpRequest::get(url).with_timeout_ms(10_000))
            .await?;
        if !response.is_success() {
            return Err(FetchError::upstream_status(response.status));
        }

        let parsed: ListResponse = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::parse(format!("eastmoney snapshot: {e}")))?;
        let rows = parsed
            .data
            .ok_or_else(|| FetchError::no_data("eastmoney snapshot payload was empty"))?
            .diff
            .into_iter()
            .filter_map(|row| {
                let code = row.code?;
                let name = row.name?;
                let price = row.price?;
                Some((
                    code,
                    SnapshotRow {
                        name,
                        price,
                        volume_ratio: row.volume_ratio,
                        turnover_rate: row.turnover_rate,
                        pe_ratio: row.pe_ratio,
                        pb_ratio: row.pb_ratio,
                    },
                ))
            })
            .collect::<HashMap<_, _>>();

        debug!(rows = rows.len(), "eastmoney market snapshot refreshed");
        let snapshot = Arc::new(Snapshot {
            fetched_at: Instant::now(),
            rows,
        });
        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn parse_kline(line: &str) -> Result<DailyBar, FetchError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 8 {
            return Err(FetchError::parse(format!(
                "eastmoney kline has {} fields, expected 8",
                fields.len()
            )));
        }

        let date = Date::parse(fields[0], DATE_FORMAT)
            .map_err(|e| FetchError::parse(format!("eastmoney kline date '{}': {e}", fields[0])))?;
        let open = parse_field(fields[1], "open")?;
        let close = parse_field(fields[2], "close")?;
        let high = parse_field(fields[3], "high")?;
        let low = parse_field(fields[4], "low")?;
        let volume = parse_field(fields[5], "volume")?;
        let amount = parse_field(fields[6], "amount")?;
        let pct_chg = parse_field(fields[7], "pct_chg")?;

        DailyBar::new(date, open, high, low, close, volume)
            .map(|bar| bar.with_amount(amount).with_pct_chg(pct_chg))
            .map_err(|e| FetchError::parse(format!("eastmoney kline: {e}")))
    }
}

fn parse_field(raw: &str, field: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FetchError::parse(format!("eastmoney {field} value '{raw}' is not numeric")))
}

impl MarketDataSource for EastmoneyAdapter {
    fn id(&self) -> SourceId {
        SourceId::Eastmoney
    }

    fn priority(&self) -> u8 {
        1
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn daily_bars<'a>(
        &'a self,
        req: BarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{KLINE_URL}?secid={}&klt=101&fqt=1&lmt={}&fields1=f1,f2,f3&fields2=f51,f52,f53,f54,f55,f56,f57,f59",
                secid(&req.symbol),
                req.limit,
            );
            let response = self
                .http_client
                .execute(HttpRequest::get(url).with_timeout_ms(10_000))
                .await?;
            if !response.is_success() {
                return Err(FetchError::upstream_status(response.status));
            }

            let parsed: KlineResponse = serde_json::from_str(&response.body)
                .map_err(|e| FetchError::parse(format!("eastmoney kline payload: {e}")))?;
            let klines = parsed
                .data
                .ok_or_else(|| {
                    FetchError::no_data(format!("eastmoney has no bars for {}", req.symbol))
                })?
                .klines;
            if klines.is_empty() {
                return Err(FetchError::no_data(format!(
                    "eastmoney answered zero bars for {}",
                    req.symbol
                )));
            }

            klines.iter().map(|line| Self::parse_kline(line)).collect()
        })
    }

    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Quote, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let snapshot = self.market_snapshot().await?;
            let row = snapshot.rows.get(symbol.as_str()).ok_or_else(|| {
                FetchError::no_data(format!("{symbol} is absent from the eastmoney snapshot"))
            })?;

            let mut quote = Quote::new(
                symbol.clone(),
                row.price,
                SourceId::Eastmoney,
                OffsetDateTime::now_utc(),
            )
            .map_err(|e| FetchError::parse(format!("eastmoney quote row: {e}")))?
            .with_name(row.name.clone());
            quote.volume_ratio = row.volume_ratio;
            quote.turnover_rate = row.turnover_rate;
            quote.pe_ratio = row.pe_ratio;
            quote.pb_ratio = row.pb_ratio;
            Ok(quote)
        })
    }

    fn ownership<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<OwnershipDistribution, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{CHIP_URL}?secid={}", secid(symbol));
            let response = self
                .http_client
                .execute(HttpRequest::get(url).with_timeout_ms(10_000))
                .await?;
            if !response.is_success() {
                return Err(FetchError::upstream_status(response.status));
            }

            let parsed: ChipResponse = serde_json::from_str(&response.body)
                .map_err(|e| FetchError::parse(format!("eastmoney chip payload: {e}")))?;
            let data = parsed.data.ok_or_else(|| {
                FetchError::no_data(format!("eastmoney has no chip data for {symbol}"))
            })?;

            OwnershipDistribution::new(
                data.profit_ratio,
                data.avg_cost,
                data.concentration_90,
                data.concentration_70,
            )
            .map_err(|e| FetchError::parse(format!("eastmoney chip row: {e}")))
        })
    }

    fn display_name<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let snapshot = self.market_snapshot().await?;
            snapshot
                .rows
                .get(symbol.as_str())
                .map(|row| row.name.clone())
                .ok_or_else(|| {
                    FetchError::no_data(format!("{symbol} is absent from the eastmoney snapshot"))
                })
        })
    }

    fn market_indices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexQuote>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            // SSE composite, SZSE component, ChiNext.
            let url = format!(
                "{INDICES_URL}?secids=1.000001,0.399001,0.399006&fields=f2,f3,f14"
            );
            let response = self
                .http_client
                .execute(HttpRequest::get(url).with_timeout_ms(10_000))
                .await?;
            if !response.is_success() {
                return Err(FetchError::upstream_status(response.status));
            }

            let parsed: ListResponse = serde_json::from_str(&response.body)
                .map_err(|e| FetchError::parse(format!("eastmoney indices payload: {e}")))?;
            let rows = parsed
                .data
                .ok_or_else(|| FetchError::no_data("eastmoney indices payload was empty"))?
                .diff;

            let indices: Vec<IndexQuote> = rows
                .into_iter()
                .filter_map(|row| {
                    Some(IndexQuote {
                        name: row.name?,
                        last: row.price?,
                        change_pct: row.change_pct.unwrap_or(0.0),
                    })
                })
                .collect();
            if indices.is_empty() {
                return Err(FetchError::no_data("eastmoney answered zero index rows"));
            }
            Ok(indices)
        })
    }
}

impl std::fmt::Debug for EastmoneyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EastmoneyAdapter")
            .field("snapshot_ttl", &self.snapshot_ttl)
            .finish_non_exhaustive()
    }
}
