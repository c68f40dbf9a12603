//! Yahoo Finance adapter.
//!
//! Serves US symbols. Bars, the realtime price, and the display name all
//! come out of the v8 chart endpoint, so one upstream surface covers every
//! capability this adapter advertises.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::data_source::{BarsRequest, CapabilitySet, Endpoint, FetchError, MarketDataSource};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Deserialize)]
struct QuoteArrays {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance adapter; sole US source, last in CN failover order.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    async fn fetch_chart(&self, symbol: &Symbol, range: &str) -> Result<ChartResult, FetchError> {
        let url = format!(
            "{CHART_URL}/{}?range={range}&interval=1d",
            urlencoding::encode(symbol.as_str()),
        );
        let request = HttpRequest::get(url)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FetchError::upstream_status(response.status));
        }

        let parsed: ChartResponse = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::parse(format!("yahoo chart payload: {e}")))?;
        if let Some(error) = parsed.chart.error {
            return Err(FetchError::no_data(format!(
                "yahoo chart error: {}",
                error.description
            )));
        }
        parsed
            .chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
            .ok_or_else(|| FetchError::no_data(format!("yahoo has no chart for {symbol}")))
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> SourceId {
        SourceId::Yahoo
    }

    fn priority(&self) -> u8 {
        3
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(true, true, false, true, false)
    }

    fn daily_bars<'a>(
        &'a self,
        req: BarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let range = if req.limit <= 125 { "6mo" } else { "1y" };
            let result = self.fetch_chart(&req.symbol, range).await?;

            let timestamps = result.timestamp.unwrap_or_default();
            let arrays = result
                .indicators
                .quote
                .into_iter()
                .next()
                .ok_or_else(|| FetchError::parse("yahoo chart carries no quote arrays"))?;

            let mut bars = Vec::with_capacity(timestamps.len());
            for (i, ts) in timestamps.iter().enumerate() {
                // Yahoo pads halted sessions with nulls; skip those rows.
                let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                    arrays.open.get(i).copied().flatten(),
                    arrays.high.get(i).copied().flatten(),
                    arrays.low.get(i).copied().flatten(),
                    arrays.close.get(i).copied().flatten(),
                    arrays.volume.get(i).copied().flatten(),
                ) else {
                    continue;
                };

                let date = OffsetDateTime::from_unix_timestamp(*ts)
                    .map_err(|e| FetchError::parse(format!("yahoo timestamp {ts}: {e}")))?
                    .date();
                let bar = DailyBar::new(date, open, high, low, close, volume)
                    .map_err(|e| FetchError::parse(format!("yahoo chart row: {e}")))?;
                bars.push(bar);
            }

            if bars.is_empty() {
                return Err(FetchError::no_data(format!(
                    "yahoo answered zero bars for {}",
                    req.symbol
                )));
            }
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
            let result = self.fetch_chart(symbol, "1d").await?;
            let price = result.meta.regular_market_price.ok_or_else(|| {
                FetchError::no_data(format!("yahoo has no market price for {symbol}"))
            })?;

            let mut quote = Quote::new(
                symbol.clone(),
                price,
                SourceId::Yahoo,
                OffsetDateTime::now_utc(),
            )
            .map_err(|e| FetchError::parse(format!("yahoo quote row: {e}")))?;
            if let Some(name) = result.meta.short_name.or(result.meta.long_name) {
                quote = quote.with_name(name);
            }
            Ok(quote)
        })
    }

    fn ownership<'a>(
        &'a self,
        _symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<OwnershipDistribution, FetchError>> + Send + 'a>> {
        Box::pin(async move { Err(FetchError::unsupported_endpoint(Endpoint::Ownership)) })
    }

    fn display_name<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let result = self.fetch_chart(symbol, "1d").await?;
            result
                .meta
                .short_name
                .or(result.meta.long_name)
                .ok_or_else(|| FetchError::no_data(format!("yahoo has no name for {symbol}")))
        })
    }

    fn market_indices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexQuote>, FetchError>> + Send + 'a>> {
        Box::pin(async move { Err(FetchError::unsupported_endpoint(Endpoint::MarketIndices)) })
    }
}

impl std::fmt::Debug for YahooAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooAdapter").finish_non_exhaustive()
    }
}
