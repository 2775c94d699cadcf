//! Per-endpoint health tracking for the database router (spec §4.F): last
//! 100 latency samples, error counts, healthy/unhealthy flag. Grounded on
//! `networking/health/checker.rs`'s probe-result shape and
//! `networking/health/aggregator.rs`'s rolling-window aggregation.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_WINDOW: usize = 100;

pub struct EndpointHealth {
    latencies: Mutex<VecDeque<Duration>>,
    error_count: AtomicU64,
    healthy: AtomicBool,
}

impl EndpointHealth {
    pub fn new() -> Self {
        Self { latencies: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)), error_count: AtomicU64::new(0), healthy: AtomicBool::new(true) }
    }

    pub fn record_success(&self, latency: Duration) {
        let mut latencies = self.latencies.lock();
        if latencies.len() == LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(latency);
        self.healthy.store(true, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.healthy.store(false, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn average_latency(&self) -> Option<Duration> {
        let latencies = self.latencies.lock();
        if latencies.is_empty() {
            return None;
        }
        let total: Duration = latencies.iter().sum();
        Some(total / latencies.len() as u32)
    }
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self::new()
    }
}
