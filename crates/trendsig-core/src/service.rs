//! Cached data access over the fetch manager.
//!
//! Realtime values live in the TTL cache under namespaced keys
//! (`quote:SYM`, `ownership:SYM`, `name:SYM`). Daily bars go through the
//! optional [`BarStore`] instead: local history that already reaches today
//! short-circuits the network entirely, and fresh fetches are written back.

use std::collections::HashMap;
use std::sync::Arc;

use time::Date;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::fetch::{AllSourcesFailed, FetcherManager};
use crate::store::BarStore;
use crate::{Config, DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol};

/// Where a daily-bar history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarsOrigin {
    /// Served from the local store without touching the network.
    Store,
    /// Fetched upstream from the named source.
    Source(SourceId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Quote(Quote),
    Ownership(OwnershipDistribution),
    Name(String),
}

/// Unified data access for analysis runs.
pub struct DataService {
    fetcher: Arc<FetcherManager>,
    store: Option<Arc<dyn BarStore>>,
    cache: TtlCache<CacheValue>,
}

impl DataService {
    pub fn new(fetcher: Arc<FetcherManager>, store: Option<Arc<dyn BarStore>>) -> Self {
        let capacity = fetcher.config().cache_capacity;
        Self {
            fetcher,
            store,
            cache: TtlCache::new(capacity),
        }
    }

    fn config(&self) -> &Config {
        self.fetcher.config()
    }

    /// Fetches daily bars, preferring local history that reaches `today`.
    ///
    /// A successful upstream fetch is written back to the store so the next
    /// run can resume locally.
    pub async fn get_daily_bars(
        &self,
        symbol: &Symbol,
        days: usize,
        today: Date,
    ) -> Result<(Vec<DailyBar>, BarsOrigin), AllSourcesFailed> {
        if let Some(store) = &self.store {
            match store.get_recent_bars(symbol, days).await {
                Ok(bars) if !bars.is_empty() => {
                    let latest = bars[bars.len() - 1].date;
                    if latest >= today {
                        info!(%symbol, bars = bars.len(), "serving daily bars from local store");
                        return Ok((bars, BarsOrigin::Store));
                    }
                    debug!(%symbol, %latest, "local history is stale, fetching upstream");
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%symbol, %error, "bar store read failed, fetching upstream");
                }
            }
        }

        let (bars, source) = self.fetcher.fetch_daily_bars(symbol, days).await?;

        if let Some(store) = &self.store {
            if let Err(error) = store.save_bars(symbol, &bars).await {
                warn!(%symbol, %error, "bar store write failed");
            }
        }

        Ok((bars, BarsOrigin::Source(source)))
    }

    /// Fetches a realtime quote through the `quote:` cache namespace.
    pub async fn get_quote(&self, symbol: &Symbol) -> Option<Quote> {
        let key = format!("quote:{symbol}");
        if let Some(CacheValue::Quote(quote)) = self.cache.get(&key).await {
            debug!(%symbol, "quote cache hit");
            return Some(quote);
        }

        let quote = self.fetcher.fetch_quote(symbol).await?;
        self.cache
            .put(key, CacheValue::Quote(quote.clone()), self.config().quote_ttl)
            .await;
        Some(quote)
    }

    /// Fetches the ownership distribution through the `ownership:` cache
    /// namespace.
    pub async fn get_ownership(&self, symbol: &Symbol) -> Option<OwnershipDistribution> {
        let key = format!("ownership:{symbol}");
        if let Some(CacheValue::Ownership(ownership)) = self.cache.get(&key).await {
            debug!(%symbol, "ownership cache hit");
            return Some(ownership);
        }

        let ownership = self.fetcher.fetch_ownership(symbol).await?;
        self.cache
            .put(
                key,
                CacheValue::Ownership(ownership),
                self.config().ownership_ttl,
            )
            .await;
        Some(ownership)
    }

    /// Resolves a display name, preferring the name carried on a cached or
    /// fresh quote before asking the adapters directly.
    pub async fn get_display_name(&self, symbol: &Symbol) -> Option<String> {
        let key = format!("name:{symbol}");
        if let Some(CacheValue::Name(name)) = self.cache.get(&key).await {
            return Some(name);
        }

        let name = match self.get_quote(symbol).await.and_then(|quote| quote.name) {
            Some(name) => name,
            None => self.fetcher.fetch_display_name(symbol).await?,
        };
        self.cache
            .put(key, CacheValue::Name(name.clone()), self.config().name_ttl)
            .await;
        Some(name)
    }

    /// Resolves display names for a batch, returning only the ones found.
    pub async fn batch_display_names(&self, symbols: &[Symbol]) -> HashMap<Symbol, String> {
        let mut names = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(name) = self.get_display_name(symbol).await {
                names.insert(symbol.clone(), name);
            }
        }
        names
    }

    pub async fn market_indices(&self) -> Vec<IndexQuote> {
        self.fetcher.market_indices().await
    }

    pub async fn prefetch_quotes(&self, symbols: &[Symbol]) -> usize {
        self.fetcher.prefetch_quotes(symbols).await
    }

    /// Drops cached realtime entries matching the glob, or everything when
    /// `None`. Returns the number of removed entries.
    pub async fn invalidate(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.invalidate(pattern).await;
        info!(pattern = pattern.unwrap_or("*all*"), removed, "cache invalidated");
        removed
    }
}

impl std::fmt::Debug for DataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("has_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
