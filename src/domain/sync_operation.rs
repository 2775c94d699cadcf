use crate::common::{SyncOperationId, SyncTransactionId};
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Customer,
    Order,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    ToLegacy,
    FromLegacy,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Retry,
    Conflict,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolutionStrategy {
    NewestWins,
    LegacyWins,
    NewSystemWins,
    AutoMerged,
    Manual,
}

/// One unit of work queued against the legacy system (spec §3: `SyncOperation`).
#[derive(Debug, Clone)]
pub struct SyncOperation {
    pub id: SyncOperationId,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub direction: SyncDirection,
    pub data: Value,
    pub original_data: Value,
    pub status: SyncStatus,
    pub priority: u8,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub transaction_id: Option<SyncTransactionId>,
    pub depends_on: Option<SyncOperationId>,
    pub legacy_data: Option<Value>,
    pub conflict_resolution: Option<ConflictResolutionStrategy>,
    pub resolved_data: Option<Value>,
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncOperation {
    pub fn new(entity_type: EntityType, entity_id: String, direction: SyncDirection, data: Value, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: SyncOperationId::new(),
            entity_type,
            entity_id,
            direction,
            original_data: data.clone(),
            data,
            status: SyncStatus::Pending,
            priority: 0,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            transaction_id: None,
            depends_on: None,
            legacy_data: None,
            conflict_resolution: None,
            resolved_data: None,
            resolved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Spec §3: a completed operation is immutable.
    pub fn is_mutable(&self) -> bool {
        self.status != SyncStatus::Completed
    }

    /// Configures the strategy used to auto-resolve conflicts detected for
    /// this op (spec §4.E). Ops left unconfigured default to `NewestWins`.
    pub fn with_conflict_resolution(mut self, strategy: ConflictResolutionStrategy) -> Self {
        self.conflict_resolution = Some(strategy);
        self
    }
}

/// Groups operations that must succeed or fail as a unit (spec §3: `SyncTransaction`).
#[derive(Debug, Clone)]
pub struct SyncTransaction {
    pub id: SyncTransactionId,
    pub atomic: bool,
    pub stop_on_error: bool,
    pub operations_count: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub status: SyncStatus,
    pub timeout_seconds: u64,
}

impl SyncTransaction {
    pub fn new(atomic: bool, stop_on_error: bool, operations_count: u32) -> Self {
        Self {
            id: SyncTransactionId::new(),
            atomic,
            stop_on_error,
            operations_count,
            completed_count: 0,
            failed_count: 0,
            status: SyncStatus::Pending,
            timeout_seconds: 300,
        }
    }

    /// Atomic transactions complete only once every child operation has
    /// completed (spec §3).
    pub fn recompute_status(&mut self) {
        if self.atomic {
            if self.failed_count > 0 && self.stop_on_error {
                self.status = SyncStatus::Failed;
            } else if self.completed_count == self.operations_count {
                self.status = SyncStatus::Completed;
            }
        } else if self.completed_count + self.failed_count == self.operations_count {
            self.status = if self.failed_count == 0 { SyncStatus::Completed } else { SyncStatus::Failed };
        }
    }
}
