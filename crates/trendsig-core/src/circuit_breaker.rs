use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct KeyState {
    failures: u32,
    last_failure: Option<Instant>,
}

/// Per-source availability gate keyed by source name.
///
/// A key becomes unavailable once its consecutive failure count reaches the
/// threshold, and stays so until the cooldown has elapsed since the last
/// failure. Any success resets the counter. This is a liveness heuristic,
/// not a three-state machine: once the cooldown lapses callers may retry
/// immediately, and the next failure re-opens the gate.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<String, KeyState>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_available(&self, key: &str) -> bool {
        let states = self
            .states
            .lock()
            .expect("circuit breaker lock is not poisoned");
        let Some(state) = states.get(key) else {
            return true;
        };

        if state.failures < self.config.failure_threshold {
            return true;
        }

        state
            .last_failure
            .map(|at| at.elapsed() >= self.config.cooldown)
            .unwrap_or(true)
    }

    pub fn record_success(&self, key: &str) {
        let mut states = self
            .states
            .lock()
            .expect("circuit breaker lock is not poisoned");
        if let Some(state) = states.get_mut(key) {
            state.failures = 0;
            state.last_failure = None;
        }
    }

    pub fn record_failure(&self, key: &str, reason: &str) {
        let mut states = self
            .states
            .lock()
            .expect("circuit breaker lock is not poisoned");
        let state = states.entry(key.to_owned()).or_default();
        state.failures = state.failures.saturating_add(1);
        state.last_failure = Some(Instant::now());

        if state.failures >= self.config.failure_threshold {
            warn!(
                key,
                failures = state.failures,
                reason,
                "source gated by circuit breaker"
            );
        }
    }

    pub fn failure_count(&self, key: &str) -> u32 {
        let states = self
            .states
            .lock()
            .expect("circuit breaker lock is not poisoned");
        states.get(key).map(|state| state.failures).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_millis(cooldown_ms),
        })
    }

    #[test]
    fn unavailable_after_exactly_threshold_failures() {
        let breaker = breaker(3, 10_000);

        breaker.record_failure("eastmoney_chip", "timeout");
        breaker.record_failure("eastmoney_chip", "timeout");
        assert!(breaker.is_available("eastmoney_chip"));

        breaker.record_failure("eastmoney_chip", "timeout");
        assert!(!breaker.is_available("eastmoney_chip"));
    }

    #[test]
    fn success_resets_counter_immediately() {
        let breaker = breaker(2, 10_000);

        breaker.record_failure("tushare_chip", "http 500");
        breaker.record_failure("tushare_chip", "http 500");
        assert!(!breaker.is_available("tushare_chip"));

        breaker.record_success("tushare_chip");
        assert!(breaker.is_available("tushare_chip"));
        assert_eq!(breaker.failure_count("tushare_chip"), 0);
    }

    #[test]
    fn cooldown_elapse_reopens_the_gate() {
        let breaker = breaker(1, 1);

        breaker.record_failure("eastmoney_chip", "timeout");
        std::thread::sleep(Duration::from_millis(2));
        assert!(breaker.is_available("eastmoney_chip"));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let breaker = breaker(1, 10_000);

        breaker.record_failure("eastmoney_chip", "timeout");
        assert!(!breaker.is_available("eastmoney_chip"));
        assert!(breaker.is_available("tushare_chip"));
    }
}
