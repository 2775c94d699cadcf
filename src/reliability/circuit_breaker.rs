//! Generic per-endpoint circuit breaker shared by `dataplane::cache` and
//! `sms`. Three states — closed, open, half-open — following spec §4.G/4.H:
//! N consecutive failures open the circuit; after a reset timeout it goes
//! half-open; one success closes it, one failure re-opens it.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Cache client default from spec §4.G: five consecutive failures open
    /// the circuit, 60s recovery.
    pub fn cache_default() -> Self {
        Self { failure_threshold: 5, reset_timeout: Duration::from_secs(60) }
    }

    /// SMS provider default from spec §4.H: threshold 3, recovery 300s.
    pub fn sms_default() -> Self {
        Self { failure_threshold: 3, reset_timeout: Duration::from_secs(300) }
    }
}

struct Inner {
    state: CircuitState,
    consecutive_failures: usize,
    last_state_change: Instant,
}

/// A single-process-local, per-endpoint circuit breaker (spec §5: "Circuit
/// breakers are per-provider/per-endpoint and single-process-local").
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: RwLock<Inner>,
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
    rejected_calls: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_state_change: Instant::now(),
            }),
            total_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    /// Whether a new call should be admitted. Transitions Open -> HalfOpen
    /// when the reset timeout has elapsed. Does not itself record a call.
    fn should_allow(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if inner.last_state_change.elapsed() >= self.config.reset_timeout {
                    info!(circuit = %self.name, "transitioning to half-open");
                    inner.state = CircuitState::HalfOpen;
                    inner.last_state_change = Instant::now();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.consecutive_failures = 0;
        if inner.state != CircuitState::Closed {
            info!(circuit = %self.name, "transitioning to closed");
            inner.state = CircuitState::Closed;
            inner.last_state_change = Instant::now();
        }
    }

    fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write();
        inner.consecutive_failures += 1;
        match inner.state {
            CircuitState::Closed if inner.consecutive_failures >= self.config.failure_threshold => {
                warn!(circuit = %self.name, failures = inner.consecutive_failures, "opening circuit");
                inner.state = CircuitState::Open;
                inner.last_state_change = Instant::now();
            }
            CircuitState::HalfOpen => {
                warn!(circuit = %self.name, "re-opening circuit after half-open failure");
                inner.state = CircuitState::Open;
                inner.last_state_change = Instant::now();
            }
            _ => {}
        }
    }

    /// Run `f` through the breaker. While open, fails fast with a
    /// `Transient` connection error instead of attempting the call.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if !self.should_allow() {
            self.rejected_calls.fetch_add(1, Ordering::Relaxed);
            return Err(CoreError::transient(format!("circuit '{}' is open", self.name)));
        }
        match f().await {
            Ok(v) => {
                self.record_success();
                Ok(v)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.total_calls.load(Ordering::Relaxed),
            self.failed_calls.load(Ordering::Relaxed),
            self.rejected_calls.load(Ordering::Relaxed),
        )
    }
}

/// A small keyed registry so callers (e.g. the SMS gateway's per-provider
/// breakers) don't each re-implement lookup-or-insert.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: RwLock<std::collections::HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, breakers: RwLock::new(std::collections::HashMap::new()) }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(b) = self.breakers.read().get(name) {
            return b.clone();
        }
        let mut map = self.breakers.write();
        map.entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config.clone())))
            .clone()
    }
}
