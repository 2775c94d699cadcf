//! Sync workers, retry scheduler, and the legacy-system executor seam
//! (spec §4.E: "N parallel workers (default 3) plus one retry scheduler
//! plus one metrics collector"). Grounded on `pool/connection_pool.rs`'s
//! worker-loop-over-a-shared-pool shape and `replication/conflicts.rs`'s
//! detect-then-resolve flow.

use super::audit::ConflictAuditLog;
use super::conflict::{detect_conflict, resolve};
use super::metrics::SyncMetrics;
use super::queue::SyncQueue;
use super::transaction::on_child_terminal;
use crate::domain::{ConflictResolutionStrategy, SyncOperation, SyncStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration as StdDuration;

pub const DEFAULT_WORKER_COUNT: usize = 3;
pub const STALE_IN_PROGRESS_MINUTES: i64 = 10;
pub const RETRY_SCHEDULER_INTERVAL: StdDuration = StdDuration::from_secs(10);

/// The legacy-system boundary a worker calls through. Returning `Ok(Some(legacy_data))`
/// signals the legacy side has a different current value (a possible
/// conflict); `Ok(None)` means the write applied cleanly.
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    async fn apply(&self, op: &SyncOperation) -> Result<Option<Value>>;
}

fn backoff_seconds(retry_count: u32) -> i64 {
    300.min(2_i64.saturating_pow(retry_count))
}

async fn handle_claimed(
    queue: &SyncQueue,
    metrics: &SyncMetrics,
    audit: &ConflictAuditLog,
    executor: &dyn SyncExecutor,
    mut op: SyncOperation,
) {
    let started = std::time::Instant::now();
    match executor.apply(&op).await {
        Ok(Some(legacy_data)) => {
            if detect_conflict(&op.data, &legacy_data, op.updated_at, Utc::now()) {
                let strategy = op.conflict_resolution.unwrap_or(ConflictResolutionStrategy::NewestWins);
                let now = Utc::now();
                match resolve(strategy, &op.data, &legacy_data, op.updated_at, now) {
                    Some(resolved_data) => {
                        op.legacy_data = Some(legacy_data);
                        op.resolved_data = Some(resolved_data);
                        op.resolved_by = Some("worker:auto_resolved".to_string());
                        op.status = SyncStatus::Pending;
                        op.updated_at = now;
                        queue.update(op.clone());
                        audit.record(op.id, strategy, "worker:auto_resolved");
                    }
                    None => {
                        op.legacy_data = Some(legacy_data);
                        op.status = SyncStatus::Conflict;
                        op.updated_at = now;
                        queue.update(op.clone());
                        audit.record(op.id, strategy, "worker:detected");
                    }
                }
            } else {
                complete(queue, metrics, &mut op, started);
            }
        }
        Ok(None) => complete(queue, metrics, &mut op, started),
        Err(_) => fail(queue, metrics, &mut op),
    }
    queue.release(op.id);
}

fn complete(queue: &SyncQueue, metrics: &SyncMetrics, op: &mut SyncOperation, started: std::time::Instant) {
    op.status = SyncStatus::Completed;
    op.updated_at = Utc::now();
    queue.update(op.clone());
    metrics.record_completion(op.entity_type, started.elapsed().as_millis() as u64);
    if let Some(tx_id) = op.transaction_id {
        on_child_terminal(queue, tx_id, true);
    }
}

fn fail(queue: &SyncQueue, metrics: &SyncMetrics, op: &mut SyncOperation) {
    op.retry_count += 1;
    if op.retry_count < op.max_retries {
        op.status = SyncStatus::Retry;
        op.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(backoff_seconds(op.retry_count)));
        op.updated_at = Utc::now();
        queue.update(op.clone());
    } else {
        op.status = SyncStatus::Failed;
        op.updated_at = Utc::now();
        queue.update(op.clone());
        metrics.record_failure(op.entity_type);
        if let Some(tx_id) = op.transaction_id {
            on_child_terminal(queue, tx_id, false);
        }
    }
}

/// Runs one worker loop until `queue.claim_next` yields nothing, at which
/// point it sleeps briefly before polling again. Intended to be spawned as
/// a long-lived `tokio::task`.
pub async fn run_worker(queue: SyncQueue, metrics: SyncMetrics, audit: ConflictAuditLog, executor: Arc<dyn SyncExecutor>) {
    loop {
        match queue.claim_next(STALE_IN_PROGRESS_MINUTES) {
            Some(op) => handle_claimed(&queue, &metrics, &audit, executor.as_ref(), op).await,
            None => tokio::time::sleep(StdDuration::from_millis(100)).await,
        }
    }
}

/// Wakes every `RETRY_SCHEDULER_INTERVAL` and transitions due `retry` ops
/// back to `pending` (spec §4.E).
pub async fn run_retry_scheduler(queue: SyncQueue) {
    loop {
        tokio::time::sleep(RETRY_SCHEDULER_INTERVAL).await;
        sweep_due_retries(&queue);
    }
}

pub fn sweep_due_retries(queue: &SyncQueue) {
    let now = Utc::now();
    for id in queue.retry_candidates() {
        if let Some(mut op) = queue.get(id) {
            if op.status == SyncStatus::Retry && op.next_retry_at.map(|at| at <= now).unwrap_or(false) {
                op.status = SyncStatus::Pending;
                op.updated_at = now;
                queue.update(op);
            }
        }
    }
}
