use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spec §3: `ImportCheckpoint`, persisted as a JSON sidecar after each batch
/// and deleted on clean completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCheckpoint {
    pub source_file: String,
    pub last_processed_row: u64,
    pub batches_completed: u64,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ImportCheckpoint {
    pub fn new(source_file: String) -> Self {
        Self { source_file, last_processed_row: 0, batches_completed: 0, errors: Vec::new(), created_at: Utc::now() }
    }
}
