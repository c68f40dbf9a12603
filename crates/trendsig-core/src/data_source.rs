//! Source adapter contract and shared request/error types.
//!
//! Every upstream market-data provider implements [`MarketDataSource`]. The
//! fetch manager only ever talks to this trait, so failover, breaker gating,
//! and caching stay independent of any concrete provider.
//!
//! # Endpoints
//!
//! | Endpoint | Returns | Description |
//! |----------|---------|-------------|
//! | DailyBars | `Vec<DailyBar>` | Historical daily OHLCV, ascending by date |
//! | Quote | [`Quote`] | Real-time snapshot |
//! | Ownership | [`OwnershipDistribution`] | Holder cost/concentration |
//! | DisplayName | `String` | Human-readable instrument name |
//! | MarketIndices | `Vec<IndexQuote>` | Market-wide index snapshot |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{DailyBar, IndexQuote, OwnershipDistribution, Quote, SourceId, Symbol};

/// Data endpoint type used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    DailyBars,
    Quote,
    Ownership,
    DisplayName,
    MarketIndices,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyBars => "daily_bars",
            Self::Quote => "quote",
            Self::Ownership => "ownership",
            Self::DisplayName => "display_name",
            Self::MarketIndices => "market_indices",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub daily_bars: bool,
    pub quote: bool,
    pub ownership: bool,
    pub display_name: bool,
    pub market_indices: bool,
}

impl CapabilitySet {
    pub const fn new(
        daily_bars: bool,
        quote: bool,
        ownership: bool,
        display_name: bool,
        market_indices: bool,
    ) -> Self {
        Self {
            daily_bars,
            quote,
            ownership,
            display_name,
            market_indices,
        }
    }

    pub const fn full() -> Self {
        Self::new(true, true, true, true, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::DailyBars => self.daily_bars,
            Endpoint::Quote => self.quote,
            Endpoint::Ownership => self.ownership,
            Endpoint::DisplayName => self.display_name,
            Endpoint::MarketIndices => self.market_indices,
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    UnsupportedEndpoint,
    Network,
    UpstreamStatus,
    Parse,
    NoData,
    InvalidRequest,
}

/// Structured adapter error consumed by fetch-manager failover.
///
/// Adapters never hand back partial rows; a payload that fails to decode is
/// surfaced whole as a `Parse` error so callers can move on to the next
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    retryable: bool,
}

impl FetchError {
    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: FetchErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream_status(status: u16) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamStatus,
            message: format!("upstream answered http {status}"),
            retryable: status >= 500,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::NoData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::UnsupportedEndpoint => "fetch.unsupported_endpoint",
            FetchErrorKind::Network => "fetch.network",
            FetchErrorKind::UpstreamStatus => "fetch.upstream_status",
            FetchErrorKind::Parse => "fetch.parse",
            FetchErrorKind::NoData => "fetch.no_data",
            FetchErrorKind::InvalidRequest => "fetch.invalid_request",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

impl From<crate::http_client::HttpError> for FetchError {
    fn from(err: crate::http_client::HttpError) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            retryable: err.retryable(),
            message: err.message().to_owned(),
        }
    }
}

/// Request payload for the daily-bars endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub symbol: Symbol,
    /// Maximum number of most-recent trading days to return.
    pub limit: usize,
}

impl BarsRequest {
    pub fn new(symbol: Symbol, limit: usize) -> Result<Self, FetchError> {
        if limit == 0 {
            return Err(FetchError::invalid_request(
                "bars request limit must be greater than zero",
            ));
        }
        Ok(Self { symbol, limit })
    }
}

/// Adapter contract for one upstream market-data provider.
///
/// Methods return boxed futures so the trait stays object-safe; the fetch
/// manager holds adapters as `Arc<dyn MarketDataSource>`.
pub trait MarketDataSource: Send + Sync {
    /// Returns the unique source identifier.
    fn id(&self) -> SourceId;

    /// Failover order among bar-capable sources; lower tries first.
    fn priority(&self) -> u8;

    /// Returns the set of supported endpoints.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetches historical daily bars, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the endpoint is unsupported, the provider
    /// is unreachable, or the payload fails to decode.
    fn daily_bars<'a>(
        &'a self,
        req: BarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyBar>, FetchError>> + Send + 'a>>;

    /// Fetches a real-time snapshot for one symbol.
    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Quote, FetchError>> + Send + 'a>>;

    /// Fetches the holder cost/concentration snapshot for one symbol.
    fn ownership<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<OwnershipDistribution, FetchError>> + Send + 'a>>;

    /// Resolves the human-readable display name for one symbol.
    fn display_name<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

    /// Fetches the market-wide index snapshot.
    fn market_indices<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexQuote>, FetchError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_supports_matches_fields() {
        let caps = CapabilitySet::new(true, false, true, false, false);
        assert!(caps.supports(Endpoint::DailyBars));
        assert!(!caps.supports(Endpoint::Quote));
        assert!(caps.supports(Endpoint::Ownership));
        assert!(!caps.supports(Endpoint::MarketIndices));
    }

    #[test]
    fn bars_request_rejects_zero_limit() {
        let symbol = Symbol::parse("600519").expect("valid symbol");
        let err = BarsRequest::new(symbol, 0).expect_err("zero limit must fail");
        assert_eq!(err.kind(), FetchErrorKind::InvalidRequest);
    }

    #[test]
    fn upstream_status_retryable_only_for_5xx() {
        assert!(FetchError::upstream_status(502).retryable());
        assert!(!FetchError::upstream_status(404).retryable());
    }
}
