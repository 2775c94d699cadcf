//! Transaction bookkeeping for grouped sync operations (spec §4.E / §3:
//! `SyncTransaction`). Grounded on `replication/conflicts.rs`'s
//! audit-then-update pattern, generalized from conflict records to
//! transaction aggregate counters.

use crate::common::SyncTransactionId;
use crate::domain::SyncStatus;
use crate::sync::queue::SyncQueue;

/// Called after an operation belonging to `tx_id` reaches a terminal state.
/// Updates the transaction's counters and, if `stop_on_error` and this was a
/// failure, cancels every still-`pending`/`retry` sibling (spec §3/§4.E).
pub fn on_child_terminal(queue: &SyncQueue, tx_id: SyncTransactionId, succeeded: bool) {
    let Some(mut tx) = queue.transaction(tx_id) else { return };
    if succeeded {
        tx.completed_count += 1;
    } else {
        tx.failed_count += 1;
    }
    tx.recompute_status();
    let should_cancel_siblings = !succeeded && tx.stop_on_error;
    queue.update_transaction(tx);

    if should_cancel_siblings {
        for op in queue.ops_for_transaction(tx_id) {
            if matches!(op.status, SyncStatus::Pending | SyncStatus::Retry) {
                let _ = queue.cancel(op.id, "sibling failure under stop_on_error".to_string());
            }
        }
    }
}
