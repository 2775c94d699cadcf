//! Durable queue of sync operations (spec §4.E). Grounded on
//! `pool/connection_pool.rs`'s claim/lock pattern, adapted from pooled
//! connections to queued operations: each row is protected by a
//! `parking_lot::Mutex`-guarded claim flag so a worker's claim attempt
//! never blocks another worker's scan.

use crate::common::{SyncOperationId, SyncTransactionId};
use crate::domain::{SyncOperation, SyncStatus, SyncTransaction};
use crate::error::{CoreError, Result};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

struct QueueRow {
    op: SyncOperation,
    locked: bool,
}

/// In-memory durable queue. A real deployment backs this with a table; the
/// claim semantics (row-level lock that skips already-locked rows) are
/// identical either way, so the storage backend is an implementation detail
/// behind this type.
#[derive(Clone)]
pub struct SyncQueue {
    rows: Arc<DashMap<SyncOperationId, Mutex<QueueRow>>>,
    transactions: Arc<DashMap<SyncTransactionId, Mutex<SyncTransaction>>>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self { rows: Arc::new(DashMap::new()), transactions: Arc::new(DashMap::new()) }
    }

    pub fn enqueue(&self, op: SyncOperation) -> SyncOperationId {
        let id = op.id;
        self.rows.insert(id, Mutex::new(QueueRow { op, locked: false }));
        id
    }

    pub fn enqueue_transaction(&self, tx: SyncTransaction, mut ops: Vec<SyncOperation>) -> (SyncTransactionId, Vec<SyncOperationId>) {
        let tx_id = tx.id;
        self.transactions.insert(tx_id, Mutex::new(tx));
        let mut ids = Vec::with_capacity(ops.len());
        for op in ops.iter_mut() {
            op.transaction_id = Some(tx_id);
        }
        for op in ops {
            ids.push(self.enqueue(op));
        }
        (tx_id, ids)
    }

    pub fn status(&self, id: SyncOperationId) -> Option<SyncStatus> {
        self.rows.get(&id).map(|r| r.lock().op.status)
    }

    pub fn status_tx(&self, id: SyncTransactionId) -> Option<SyncStatus> {
        self.transactions.get(&id).map(|t| t.lock().status)
    }

    pub fn get(&self, id: SyncOperationId) -> Option<SyncOperation> {
        self.rows.get(&id).map(|r| r.lock().op.clone())
    }

    /// Resets a `conflict` operation back to `pending` with the supplied
    /// resolution recorded (spec §4.E: `resolve_conflict`).
    pub fn resolve_conflict(&self, id: SyncOperationId, resolved_data: serde_json::Value, resolved_by: String) -> Result<()> {
        let row = self.rows.get(&id).ok_or_else(|| CoreError::not_found(format!("sync op {id}")))?;
        let mut guard = row.lock();
        if guard.op.status != SyncStatus::Conflict {
            return Err(CoreError::validation(format!("sync op {id} is not in conflict")));
        }
        guard.op.resolved_data = Some(resolved_data);
        guard.op.resolved_by = Some(resolved_by);
        guard.op.status = SyncStatus::Pending;
        guard.op.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels a `pending`/`retry` operation (spec §4.E).
    pub fn cancel(&self, id: SyncOperationId, _reason: String) -> Result<()> {
        let row = self.rows.get(&id).ok_or_else(|| CoreError::not_found(format!("sync op {id}")))?;
        let mut guard = row.lock();
        if !matches!(guard.op.status, SyncStatus::Pending | SyncStatus::Retry) {
            return Err(CoreError::validation(format!("sync op {id} cannot be cancelled from {:?}", guard.op.status)));
        }
        guard.op.status = SyncStatus::Cancelled;
        guard.op.updated_at = Utc::now();
        Ok(())
    }

    /// Resets `failed` ops matching `entity_type` (if given) back to
    /// `pending`, up to `limit` (spec §4.E: `retry_failed`).
    pub fn retry_failed(&self, entity_type: Option<crate::domain::EntityType>, limit: usize) -> usize {
        let mut reset = 0;
        for entry in self.rows.iter() {
            if reset >= limit {
                break;
            }
            let mut guard = entry.value().lock();
            if guard.op.status != SyncStatus::Failed {
                continue;
            }
            if let Some(filter) = entity_type {
                if guard.op.entity_type != filter {
                    continue;
                }
            }
            guard.op.status = SyncStatus::Pending;
            guard.op.retry_count = 0;
            guard.op.updated_at = Utc::now();
            reset += 1;
        }
        reset
    }

    /// Claims the highest-priority claimable op: `pending`, or `in_progress`
    /// stale by more than `stale_after_minutes` (spec §4.E: 10 minutes).
    /// Ties broken by `created_at` ascending (FIFO), matching the ordering
    /// guarantee in spec §5.
    pub fn claim_next(&self, stale_after_minutes: i64) -> Option<SyncOperation> {
        let now = Utc::now();
        let mut best: Option<(SyncOperationId, u8, chrono::DateTime<Utc>)> = None;

        for entry in self.rows.iter() {
            let guard = entry.value().lock();
            if guard.locked {
                continue;
            }
            let claimable = guard.op.status == SyncStatus::Pending
                || (guard.op.status == SyncStatus::InProgress
                    && now.signed_duration_since(guard.op.updated_at) > chrono::Duration::minutes(stale_after_minutes));
            if !claimable {
                continue;
            }
            if let Some(dep) = guard.op.depends_on {
                if self.status(dep) != Some(SyncStatus::Completed) {
                    continue;
                }
            }
            let candidate = (guard.op.id, guard.op.priority, guard.op.created_at);
            let better = match &best {
                None => true,
                Some((_, best_priority, best_created_at)) => {
                    candidate.1 > *best_priority || (candidate.1 == *best_priority && candidate.2 < *best_created_at)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        let (id, _, _) = best?;
        let row = self.rows.get(&id)?;
        let mut guard = row.lock();
        guard.locked = true;
        guard.op.status = SyncStatus::InProgress;
        guard.op.updated_at = now;
        Some(guard.op.clone())
    }

    pub fn release(&self, id: SyncOperationId) {
        if let Some(row) = self.rows.get(&id) {
            row.lock().locked = false;
        }
    }

    pub fn update(&self, op: SyncOperation) {
        if let Some(row) = self.rows.get(&op.id) {
            row.lock().op = op;
        }
    }

    pub fn transaction(&self, id: SyncTransactionId) -> Option<SyncTransaction> {
        self.transactions.get(&id).map(|t| t.lock().clone())
    }

    pub fn update_transaction(&self, tx: SyncTransaction) {
        if let Some(entry) = self.transactions.get(&tx.id) {
            *entry.lock() = tx;
        }
    }

    /// All ops sharing `transaction_id`.
    pub fn ops_for_transaction(&self, tx_id: SyncTransactionId) -> Vec<SyncOperation> {
        self.rows.iter().filter(|e| e.value().lock().op.transaction_id == Some(tx_id)).map(|e| e.value().lock().op.clone()).collect()
    }

    /// Ids of all ops currently in `retry` status, for the retry scheduler's
    /// periodic sweep (spec §4.E).
    pub fn retry_candidates(&self) -> Vec<SyncOperationId> {
        self.rows.iter().filter(|e| e.value().lock().op.status == SyncStatus::Retry).map(|e| *e.key()).collect()
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}
