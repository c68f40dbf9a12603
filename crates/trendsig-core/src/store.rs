//! Local persisted-bars collaborator.
//!
//! The data service treats the store as a cache tier above the network:
//! when local history already reaches today, upstream sources are not
//! touched at all. The core never persists anything itself; callers plug
//! in whatever backing they want through [`BarStore`].

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use thiserror::Error;
use time::Date;

use crate::{DailyBar, Symbol};

/// Storage-level failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("bar store error: {message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Persisted daily-bar collection.
pub trait BarStore: Send + Sync {
    /// Whether the stored history for `symbol` already includes `today`.
    fn has_today_data<'a>(
        &'a self,
        symbol: &'a Symbol,
        today: Date,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>>;

    /// Returns up to `days` most-recent bars, ascending by date. An empty
    /// vector means nothing is stored for the symbol.
    fn get_recent_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        days: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, StoreError>> + Send + 'a>>;

    /// Upserts bars by date; a re-fetch overwrites, never duplicates.
    fn save_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        bars: &'a [DailyBar],
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// In-memory store used by tests and single-run setups.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    bars: Mutex<HashMap<Symbol, BTreeMap<Date, DailyBar>>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BarStore for MemoryBarStore {
    fn has_today_data<'a>(
        &'a self,
        symbol: &'a Symbol,
        today: Date,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let bars = self.bars.lock().expect("bar store lock is not poisoned");
            Ok(bars
                .get(symbol)
                .is_some_and(|history| history.contains_key(&today)))
        })
    }

    fn get_recent_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        days: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let bars = self.bars.lock().expect("bar store lock is not poisoned");
            let Some(history) = bars.get(symbol) else {
                return Ok(Vec::new());
            };
            let skip = history.len().saturating_sub(days);
            Ok(history.values().skip(skip).cloned().collect())
        })
    }

    fn save_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        bars: &'a [DailyBar],
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut store = self.bars.lock().expect("bar store lock is not poisoned");
            let history = store.entry(symbol.clone()).or_default();
            for bar in bars {
                history.insert(bar.date, bar.clone());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn bar(date: Date, close: f64) -> DailyBar {
        DailyBar::new(date, close, close + 0.5, close - 0.5, close, 1_000.0).expect("valid bar")
    }

    #[tokio::test]
    async fn refetch_overwrites_instead_of_duplicating() {
        let store = MemoryBarStore::new();
        let symbol = Symbol::parse("600519").expect("valid");

        store
            .save_bars(&symbol, &[bar(date!(2025 - 01 - 06), 10.0)])
            .await
            .expect("save");
        store
            .save_bars(&symbol, &[bar(date!(2025 - 01 - 06), 10.5)])
            .await
            .expect("save");

        let bars = store.get_recent_bars(&symbol, 30).await.expect("get");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 10.5);
    }

    #[tokio::test]
    async fn recent_bars_are_ascending_and_bounded() {
        let store = MemoryBarStore::new();
        let symbol = Symbol::parse("600519").expect("valid");

        store
            .save_bars(
                &symbol,
                &[
                    bar(date!(2025 - 01 - 08), 12.0),
                    bar(date!(2025 - 01 - 06), 10.0),
                    bar(date!(2025 - 01 - 07), 11.0),
                ],
            )
            .await
            .expect("save");

        let bars = store.get_recent_bars(&symbol, 2).await.expect("get");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date!(2025 - 01 - 07));
        assert_eq!(bars[1].date, date!(2025 - 01 - 08));
    }

    #[tokio::test]
    async fn has_today_data_checks_exact_date() {
        let store = MemoryBarStore::new();
        let symbol = Symbol::parse("600519").expect("valid");

        store
            .save_bars(&symbol, &[bar(date!(2025 - 01 - 06), 10.0)])
            .await
            .expect("save");

        assert!(store
            .has_today_data(&symbol, date!(2025 - 01 - 06))
            .await
            .expect("query"));
        assert!(!store
            .has_today_data(&symbol, date!(2025 - 01 - 07))
            .await
            .expect("query"));
    }
}
