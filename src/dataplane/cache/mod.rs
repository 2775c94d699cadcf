pub mod client;
pub mod metrics;

pub use client::{CacheBackend, CacheClient, CacheDiscovery};
pub use metrics::{CacheMetrics, OpStats};
