use std::time::Duration;

use crate::{CircuitBreakerConfig, SourceId};

/// Runtime configuration for acquisition, caching, and pipeline execution.
///
/// Everything is dependency-injected from here; there are no process-global
/// settings. `Default` mirrors production values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Quote failover order, independent of the bar-source priority order.
    pub quote_source_priority: Vec<SourceId>,
    pub enable_realtime_quotes: bool,
    pub enable_ownership: bool,
    pub quote_ttl: Duration,
    pub ownership_ttl: Duration,
    pub name_ttl: Duration,
    pub cache_capacity: usize,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Pause between pipeline stages; throttles upstream request bursts.
    pub stage_delay: Duration,
    /// Concurrent symbol runs in a batch.
    pub batch_concurrency: usize,
    /// Trading days of history requested for analysis.
    pub bar_history_days: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quote_source_priority: vec![SourceId::Eastmoney, SourceId::Tushare],
            enable_realtime_quotes: true,
            enable_ownership: true,
            quote_ttl: Duration::from_secs(60),
            ownership_ttl: Duration::from_secs(1_800),
            name_ttl: Duration::from_secs(86_400),
            cache_capacity: 1_024,
            circuit_breaker: CircuitBreakerConfig::default(),
            stage_delay: Duration::from_millis(500),
            batch_concurrency: 4,
            bar_history_days: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quote_priority_prefers_eastmoney() {
        let config = Config::default();
        assert_eq!(
            config.quote_source_priority,
            vec![SourceId::Eastmoney, SourceId::Tushare]
        );
        assert!(config.enable_realtime_quotes);
        assert!(config.batch_concurrency > 0);
    }
}
