//! HA database router (spec §4.F): writes go to the single primary, reads
//! round-robin over the currently healthy replica set, falling back to the
//! primary with a warning when no replica is healthy. Grounded on
//! `networking/loadbalancer/strategies/round_robin.rs` (atomic-cursor
//! rotation) and `networking/health/checker.rs` (probe trait shape).

use super::health::EndpointHealth;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A single database connection/endpoint. No live SQL driver is wired here
/// (out of scope per spec §1); callers supply the actual query work as a
/// closure to `DbRouter::write`/`read`, and this trait only carries what the
/// router itself needs: a liveness probe and a name for logging/metrics.
#[async_trait]
pub trait DbEndpoint: Send + Sync {
    async fn probe(&self) -> Result<()>;
    fn name(&self) -> &str;
}

pub struct ReplicaSlot {
    pub endpoint: Arc<dyn DbEndpoint>,
    pub health: Arc<EndpointHealth>,
}

/// Routes writes to `primary`, reads over `replicas` (spec §4.F).
pub struct DbRouter {
    primary: Arc<dyn DbEndpoint>,
    replicas: Vec<ReplicaSlot>,
    read_cursor: AtomicUsize,
}

impl DbRouter {
    pub fn new(primary: Arc<dyn DbEndpoint>, replicas: Vec<Arc<dyn DbEndpoint>>) -> Self {
        Self {
            primary,
            replicas: replicas.into_iter().map(|endpoint| ReplicaSlot { endpoint, health: Arc::new(EndpointHealth::new()) }).collect(),
            read_cursor: AtomicUsize::new(0),
        }
    }

    pub fn replica_slots(&self) -> &[ReplicaSlot] {
        &self.replicas
    }

    pub fn primary(&self) -> Arc<dyn DbEndpoint> {
        self.primary.clone()
    }

    /// Writes always go to the primary (spec §4.F).
    pub async fn write<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn DbEndpoint>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        f(self.primary.clone()).await
    }

    /// Reads round-robin over the healthy replica set; falls back to the
    /// primary (with a warning) when no replica is healthy.
    pub async fn read<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn DbEndpoint>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.next_healthy_replica() {
            Some(endpoint) => f(endpoint).await,
            None => {
                warn!("no healthy replicas; routing read to primary");
                f(self.primary.clone()).await
            }
        }
    }

    fn next_healthy_replica(&self) -> Option<Arc<dyn DbEndpoint>> {
        let healthy: Vec<&ReplicaSlot> = self.replicas.iter().filter(|slot| slot.health.is_healthy()).collect();
        if healthy.is_empty() {
            return None;
        }
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Some(healthy[index].endpoint.clone())
    }

    /// One round of health probing over every replica (spec §4.F: every
    /// 30s). Intended to be called from a periodic loop.
    pub async fn check_replica_health(&self) {
        for slot in &self.replicas {
            let start = Instant::now();
            match slot.endpoint.probe().await {
                Ok(()) => slot.health.record_success(start.elapsed()),
                Err(e) => {
                    warn!(replica = slot.endpoint.name(), error = %e, "replica health probe failed");
                    slot.health.record_failure();
                }
            }
        }
    }
}

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Runs `check_replica_health` forever at `HEALTH_CHECK_INTERVAL` (spec
/// §4.F/§5: "one health-check loop per data-plane client").
pub async fn run_health_loop(router: Arc<DbRouter>) {
    loop {
        tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
        router.check_replica_health().await;
        info!("db router health check complete");
    }
}
