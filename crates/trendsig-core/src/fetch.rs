//! Priority-ordered failover over the registered source adapters.
//!
//! The manager owns the adapter list sorted by ascending priority and walks
//! it on every acquisition. Mandatory data (daily bars) fails hard with
//! [`AllSourcesFailed`]; enrichment data (quote, ownership, names, indices)
//! degrades to `None`/empty so a flaky provider cannot sink an analysis run.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data_source::{BarsRequest, Endpoint, FetchError, MarketDataSource};
use crate::{
    CircuitBreaker, DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol,
};

/// Sources whose quote endpoint pulls the whole market in one request.
const BULK_QUOTE_SOURCES: [SourceId; 2] = [SourceId::Eastmoney, SourceId::Tushare];

/// Ownership lookups pair each source with its own breaker key.
const OWNERSHIP_SOURCES: [(SourceId, &str); 2] = [
    (SourceId::Eastmoney, "eastmoney_chip"),
    (SourceId::Tushare, "tushare_chip"),
];

/// Raised when every registered source failed to produce daily bars.
#[derive(Debug, Error)]
#[error("all sources failed for {symbol}: {}", format_failures(.failures))]
pub struct AllSourcesFailed {
    pub symbol: Symbol,
    /// Per-source failures in the priority order they were attempted.
    pub failures: Vec<(SourceId, FetchError)>,
}

fn format_failures(failures: &[(SourceId, FetchError)]) -> String {
    failures
        .iter()
        .map(|(source, error)| format!("[{source}] {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failover coordinator over the registered adapters.
pub struct FetcherManager {
    adapters: Vec<Arc<dyn MarketDataSource>>,
    config: Config,
    breaker: Arc<CircuitBreaker>,
}

impl FetcherManager {
    pub fn new(
        mut adapters: Vec<Arc<dyn MarketDataSource>>,
        config: Config,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        adapters.sort_by_key(|adapter| adapter.priority());
        let order = adapters
            .iter()
            .map(|a| format!("{}(P{})", a.id(), a.priority()))
            .collect::<Vec<_>>()
            .join(", ");
        info!(order, "initialized {} data sources", adapters.len());
        Self {
            adapters,
            config,
            breaker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn adapter(&self, id: SourceId) -> Option<&Arc<dyn MarketDataSource>> {
        self.adapters.iter().find(|adapter| adapter.id() == id)
    }

    /// Fetches daily bars from the first source that answers a non-empty
    /// history, together with the source that produced them.
    pub async fn fetch_daily_bars(
        &self,
        symbol: &Symbol,
        days: usize,
    ) -> Result<(Vec<DailyBar>, SourceId), AllSourcesFailed> {
        let mut failures = Vec::new();

        for adapter in &self.adapters {
            if !adapter.capabilities().supports(Endpoint::DailyBars) {
                continue;
            }

            let request = match BarsRequest::new(symbol.clone(), days) {
                Ok(request) => request,
                Err(error) => {
                    failures.push((adapter.id(), error));
                    continue;
                }
            };

            debug!(source = %adapter.id(), %symbol, "trying daily bars");
            match adapter.daily_bars(request).await {
                Ok(bars) if !bars.is_empty() => {
                    info!(source = %adapter.id(), %symbol, bars = bars.len(), "daily bars fetched");
                    return Ok((bars, adapter.id()));
                }
                Ok(_) => {
                    failures.push((
                        adapter.id(),
                        FetchError::no_data(format!("{} answered an empty history", adapter.id())),
                    ));
                }
                Err(error) => {
                    warn!(source = %adapter.id(), %symbol, %error, "daily bars failed");
                    failures.push((adapter.id(), error));
                }
            }
        }

        Err(AllSourcesFailed {
            symbol: symbol.clone(),
            failures,
        })
    }

    /// Fetches a realtime quote, walking the configured quote-source order.
    /// US symbols go straight to Yahoo. Degrades to `None`.
    pub async fn fetch_quote(&self, symbol: &Symbol) -> Option<Quote> {
        if !self.config.enable_realtime_quotes {
            debug!(%symbol, "realtime quotes are disabled");
            return None;
        }

        if symbol.is_us() {
            let adapter = self.adapter(SourceId::Yahoo)?;
            return match adapter.quote(symbol).await {
                Ok(quote) if quote.has_basic_data() => Some(quote),
                Ok(_) => None,
                Err(error) => {
                    warn!(%symbol, %error, "us quote failed");
                    None
                }
            };
        }

        for source in &self.config.quote_source_priority {
            let Some(adapter) = self.adapter(*source) else {
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Quote) {
                continue;
            }

            match adapter.quote(symbol).await {
                Ok(quote) if quote.has_basic_data() => {
                    info!(%symbol, source = %source, "quote fetched");
                    return Some(quote);
                }
                Ok(_) => {
                    debug!(%symbol, source = %source, "quote lacks basic data, trying next");
                }
                Err(error) => {
                    warn!(%symbol, source = %source, %error, "quote failed, trying next");
                }
            }
        }

        warn!(%symbol, "all quote sources failed");
        None
    }

    /// Fetches the ownership distribution behind the shared circuit
    /// breaker. Sources already gated are skipped. Degrades to `None`.
    pub async fn fetch_ownership(&self, symbol: &Symbol) -> Option<OwnershipDistribution> {
        if !self.config.enable_ownership {
            return None;
        }

        for (source, breaker_key) in OWNERSHIP_SOURCES {
            if !self.breaker.is_available(breaker_key) {
                debug!(%symbol, source = %source, "ownership source gated, skipping");
                continue;
            }
            let Some(adapter) = self.adapter(source) else {
                continue;
            };
            if !adapter.capabilities().supports(Endpoint::Ownership) {
                continue;
            }

            match adapter.ownership(symbol).await {
                Ok(ownership) => {
                    self.breaker.record_success(breaker_key);
                    return Some(ownership);
                }
                Err(error) => {
                    warn!(%symbol, source = %source, %error, "ownership failed");
                    self.breaker.record_failure(breaker_key, error.message());
                }
            }
        }

        None
    }

    /// Resolves a display name from the first adapter that knows one.
    pub async fn fetch_display_name(&self, symbol: &Symbol) -> Option<String> {
        for adapter in &self.adapters {
            if !adapter.capabilities().supports(Endpoint::DisplayName) {
                continue;
            }
            match adapter.display_name(symbol).await {
                Ok(name) if !name.is_empty() => return Some(name),
                Ok(_) => {}
                Err(error) => {
                    debug!(%symbol, source = %adapter.id(), %error, "display name failed");
                }
            }
        }
        None
    }

    /// Fetches the market index snapshot from the first source that answers
    /// a non-empty list.
    pub async fn market_indices(&self) -> Vec<IndexQuote> {
        for adapter in &self.adapters {
            if !adapter.capabilities().supports(Endpoint::MarketIndices) {
                continue;
            }
            match adapter.market_indices().await {
                Ok(indices) if !indices.is_empty() => return indices,
                Ok(_) => {}
                Err(error) => {
                    warn!(source = %adapter.id(), %error, "market indices failed");
                }
            }
        }
        Vec::new()
    }

    /// Warms the bulk quote snapshot ahead of a batch run.
    ///
    /// Only worthwhile when a bulk-capable source sits in the first two
    /// quote-priority slots and the batch is at least five symbols; one
    /// quote then fills the shared snapshot for everyone. Returns how many
    /// symbols are expected to benefit, zero when prefetching was skipped.
    pub async fn prefetch_quotes(&self, symbols: &[Symbol]) -> usize {
        if !self.config.enable_realtime_quotes {
            return 0;
        }

        let bulk_index = self
            .config
            .quote_source_priority
            .iter()
            .position(|source| BULK_QUOTE_SOURCES.contains(source));
        match bulk_index {
            Some(index) if index < 2 => {}
            _ => return 0,
        }

        if symbols.len() < 5 {
            return 0;
        }

        info!(symbols = symbols.len(), "prefetching realtime quotes");
        let Some(first) = symbols.first() else {
            return 0;
        };
        match self.fetch_quote(first).await {
            Some(_) => {
                info!("bulk prefetch complete, snapshot filled");
                symbols.len()
            }
            None => {
                warn!("bulk prefetch failed, falling back to per-symbol lookups");
                0
            }
        }
    }
}

impl std::fmt::Debug for FetcherManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherManager")
            .field("adapters", &self.adapters.len())
            .finish_non_exhaustive()
    }
}
