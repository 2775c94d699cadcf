//! Per-entity-type sync metrics (spec §4.E: `metrics()` — counters per
//! entity type, success rate, average latency, oldest pending). Grounded on
//! `cache/cache_statistics.rs`'s atomic-counter-per-key shape, adapted from
//! cache ops to entity types.

use crate::domain::EntityType;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct EntityCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    total_latency_ms: AtomicU64,
    latency_samples: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityMetrics {
    pub completed: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
}

#[derive(Clone, Default)]
pub struct SyncMetrics {
    per_entity: std::sync::Arc<DashMap<EntityType, EntityCounters>>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completion(&self, entity_type: EntityType, latency_ms: u64) {
        let counters = self.per_entity.entry(entity_type).or_default();
        counters.completed.fetch_add(1, Ordering::Relaxed);
        counters.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        counters.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, entity_type: EntityType) {
        self.per_entity.entry(entity_type).or_default().failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn for_entity(&self, entity_type: EntityType) -> EntityMetrics {
        match self.per_entity.get(&entity_type) {
            Some(c) => {
                let completed = c.completed.load(Ordering::Relaxed);
                let failed = c.failed.load(Ordering::Relaxed);
                let samples = c.latency_samples.load(Ordering::Relaxed);
                let total = completed + failed;
                EntityMetrics {
                    completed,
                    failed,
                    success_rate: if total > 0 { completed as f64 / total as f64 } else { 1.0 },
                    average_latency_ms: if samples > 0 {
                        c.total_latency_ms.load(Ordering::Relaxed) as f64 / samples as f64
                    } else {
                        0.0
                    },
                }
            }
            None => EntityMetrics { completed: 0, failed: 0, success_rate: 1.0, average_latency_ms: 0.0 },
        }
    }
}

/// `oldest_pending(created_at of the oldest still-pending op)` given an
/// iterator of pending timestamps; returns the age in seconds relative to
/// `now`, matching the "oldest pending" field in spec §4.E's `metrics()`.
pub fn oldest_pending_age_seconds(pending_created_at: impl Iterator<Item = DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    pending_created_at.min().map(|oldest| now.signed_duration_since(oldest).num_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn success_rate_is_computed_from_completions_and_failures() {
        let metrics = SyncMetrics::new();
        metrics.record_completion(EntityType::Order, 100);
        metrics.record_completion(EntityType::Order, 200);
        metrics.record_failure(EntityType::Order);
        let m = metrics.for_entity(EntityType::Order);
        assert_eq!(m.completed, 2);
        assert_eq!(m.failed, 1);
        assert!((m.success_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(m.average_latency_ms, 150.0);
    }

    #[test]
    fn untouched_entity_type_defaults_to_perfect_success_rate() {
        let metrics = SyncMetrics::new();
        let m = metrics.for_entity(EntityType::Delivery);
        assert_eq!(m.completed, 0);
        assert_eq!(m.success_rate, 1.0);
    }

    #[test]
    fn oldest_pending_picks_the_minimum_timestamp() {
        let now = Utc::now();
        let timestamps = vec![now - Duration::minutes(5), now - Duration::minutes(30)];
        let age = oldest_pending_age_seconds(timestamps.into_iter(), now).unwrap();
        assert!(age >= 30 * 60 - 1);
    }

    #[test]
    fn no_pending_ops_yields_none() {
        assert!(oldest_pending_age_seconds(std::iter::empty(), Utc::now()).is_none());
    }
}
