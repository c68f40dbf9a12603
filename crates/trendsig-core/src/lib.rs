//! # Trendsig Core
//!
//! Staged stock-analysis engine: resilient multi-source market data
//! acquisition feeding a deterministic multi-indicator signal scorer.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Trendsig:
//!
//! - **Canonical domain models** for daily bars, quotes, and ownership data
//! - **Source identifiers** and a capability matrix for multi-adapter support
//! - **Priority failover** across adapters with a keyed circuit breaker
//! - **TTL cache and bar store** so repeat runs skip the network
//! - **Technical indicators** (MA, MACD, RSI) and the composite signal scorer
//! - **Staged pipeline** with reverse-order rollback and batch execution
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Source adapters (Eastmoney, Tushare, Yahoo) |
//! | [`analysis`] | Trend/volume/support classification and signal scoring |
//! | [`cache`] | TTL cache with glob invalidation |
//! | [`circuit_breaker`] | Keyed failure-count breaker for upstream calls |
//! | [`data_source`] | Source trait and request/error types |
//! | [`domain`] | Domain models (Symbol, DailyBar, Quote, ownership) |
//! | [`error`] | Core error types |
//! | [`fetch`] | Priority-ordered failover manager |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indicators`] | MA / MACD / RSI series computation |
//! | [`pipeline`] | Staged execution with rollback |
//! | [`service`] | Cached data access over the fetch manager |
//! | [`source`] | Source identifiers |
//! | [`store`] | Local daily-bar persistence trait |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trendsig_core::{
//!     CircuitBreaker, Config, DataService, EastmoneyAdapter, FetcherManager,
//!     ReqwestHttpClient, Symbol, TushareAdapter,
//! };
//! use trendsig_core::pipeline::stages::standard_pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let http = Arc::new(ReqwestHttpClient::new());
//!     let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker));
//!     let fetcher = Arc::new(FetcherManager::new(
//!         vec![
//!             Arc::new(EastmoneyAdapter::new(Arc::clone(&http) as _)),
//!             Arc::new(TushareAdapter::new(http, std::env::var("TUSHARE_TOKEN")?)),
//!         ],
//!         config.clone(),
//!         breaker,
//!     ));
//!     let service = Arc::new(DataService::new(fetcher, None));
//!
//!     let pipeline = Arc::new(standard_pipeline(service, &config));
//!     let symbols = vec![Symbol::parse("600519")?];
//!     for (symbol, outcome) in pipeline.run_batch(symbols, config.batch_concurrency).await {
//!         match outcome {
//!             Ok(context) => {
//!                 if let Some(trend) = context.trend_result() {
//!                     println!("{symbol}: {} ({})", trend.buy_signal, trend.signal_score);
//!                 }
//!             }
//!             Err(error) => eprintln!("{symbol}: {error}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Acquisition errors are structured: every [`FetchError`] carries a kind,
//! a stable machine code, and whether a retry against the same source makes
//! sense. When every source fails, [`AllSourcesFailed`] lists each attempt
//! in the priority order it was made.

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod indicators;
pub mod pipeline;
pub mod service;
pub mod source;
pub mod store;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{EastmoneyAdapter, TushareAdapter, YahooAdapter};

// Analysis types
pub use analysis::{
    BuySignal, MacdState, RsiState, TrendAnalyzer, TrendResult, TrendState, VolumeState,
};

// Caching
pub use cache::TtlCache;

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};

// Configuration
pub use config::Config;

// Data source trait and types
pub use data_source::{
    BarsRequest, CapabilitySet, Endpoint, FetchError, FetchErrorKind, MarketDataSource,
};

// Domain models
pub use domain::{DailyBar, IndexQuote, Market, OwnershipDistribution, Quote, Symbol};

// Error types
pub use error::{CoreError, ValidationError};

// Fetch manager
pub use fetch::{AllSourcesFailed, FetcherManager};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Indicators
pub use indicators::{IndicatorSet, Macd, MovingAverages};

// Pipeline types
pub use pipeline::{
    ContextValue, Pipeline, PipelineStage, StageContext, StageError,
};

// Data service
pub use service::{BarsOrigin, DataService};

// Source identifiers
pub use source::SourceId;

// Bar store
pub use store::{BarStore, MemoryBarStore, StoreError};
