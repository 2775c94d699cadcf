//! Audit trail of conflict resolutions (spec §3/§4.E: resolution records
//! `resolved_by`). Grounded on `audit/audit_logger.rs`'s append-only,
//! in-memory-then-flush log shape.

use crate::common::SyncOperationId;
use crate::domain::ConflictResolutionStrategy;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ConflictAuditEntry {
    pub operation_id: SyncOperationId,
    pub strategy: ConflictResolutionStrategy,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct ConflictAuditLog {
    entries: Arc<Mutex<Vec<ConflictAuditEntry>>>,
}

impl ConflictAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation_id: SyncOperationId, strategy: ConflictResolutionStrategy, resolved_by: impl Into<String>) {
        self.entries.lock().push(ConflictAuditEntry {
            operation_id,
            strategy,
            resolved_by: resolved_by.into(),
            resolved_at: Utc::now(),
        });
    }

    pub fn entries_for(&self, operation_id: SyncOperationId) -> Vec<ConflictAuditEntry> {
        self.entries.lock().iter().filter(|e| e.operation_id == operation_id).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_retrievable_by_operation_id() {
        let log = ConflictAuditLog::new();
        let id = SyncOperationId::new();
        log.record(id, ConflictResolutionStrategy::NewestWins, "system");
        assert_eq!(log.entries_for(id).len(), 1);
        assert_eq!(log.entries_for(SyncOperationId::new()).len(), 0);
    }
}
