//! Per-operation counters and latency windows for the cache client (spec
//! §4.G): per-op counters, latency windows (last 1000), hit/miss for `get`,
//! connection error tally. Grounded on `cache/cache_statistics.rs`'s
//! hit/miss counter shape, generalized to a per-operation map.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_WINDOW: usize = 1000;

#[derive(Default)]
struct OpCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    latencies: Mutex<VecDeque<Duration>>,
}

#[derive(Debug, Clone)]
pub struct OpStats {
    pub calls: u64,
    pub errors: u64,
    pub average_latency: Option<Duration>,
}

#[derive(Default)]
pub struct CacheMetrics {
    per_op: DashMap<String, OpCounters>,
    hits: AtomicU64,
    misses: AtomicU64,
    connection_errors: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, op: &str, latency: Duration, succeeded: bool) {
        let counters = self.per_op.entry(op.to_string()).or_default();
        counters.calls.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            counters.errors.fetch_add(1, Ordering::Relaxed);
            self.connection_errors.fetch_add(1, Ordering::Relaxed);
        }
        let mut latencies = counters.latencies.lock();
        if latencies.len() == LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(latency);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn connection_errors(&self) -> u64 {
        self.connection_errors.load(Ordering::Relaxed)
    }

    pub fn for_op(&self, op: &str) -> OpStats {
        match self.per_op.get(op) {
            Some(c) => {
                let latencies = c.latencies.lock();
                let average_latency = if latencies.is_empty() {
                    None
                } else {
                    Some(latencies.iter().sum::<Duration>() / latencies.len() as u32)
                };
                OpStats { calls: c.calls.load(Ordering::Relaxed), errors: c.errors.load(Ordering::Relaxed), average_latency }
            }
            None => OpStats { calls: 0, errors: 0, average_latency: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_computed_from_hits_and_misses() {
        let m = CacheMetrics::new();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        assert!((m.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn per_op_stats_track_calls_and_errors() {
        let m = CacheMetrics::new();
        m.record("get", Duration::from_millis(1), true);
        m.record("get", Duration::from_millis(3), false);
        let stats = m.for_op("get");
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(m.connection_errors(), 1);
    }

    #[test]
    fn unused_op_has_empty_stats() {
        let m = CacheMetrics::new();
        let stats = m.for_op("delete");
        assert_eq!(stats.calls, 0);
        assert!(stats.average_latency.is_none());
    }
}
