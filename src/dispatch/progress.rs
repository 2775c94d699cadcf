//! Progress streaming for an in-flight optimization run (spec §4.D: events
//! `{optimization_id, percentage, message, timestamp}` at milestones 0, 10,
//! 20, 30, 40, 50, 80, 100). Grounded on the teacher's `tokio::sync::broadcast`
//! fan-out pattern in `networking/health/aggregator.rs` for publishing
//! periodic status to many subscribers without a per-subscriber queue.

use crate::common::OptimizationId;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

pub const MILESTONES: [u8; 8] = [0, 10, 20, 30, 40, 50, 80, 100];

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub optimization_id: OptimizationId,
    pub percentage: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Publishes milestone events for one optimization run. Percentages
/// published per run are strictly non-decreasing, matching the monotonic
/// progress contract implied by spec §4.D.
pub struct ProgressPublisher {
    optimization_id: OptimizationId,
    sender: broadcast::Sender<ProgressEvent>,
    last_percentage: u8,
}

impl ProgressPublisher {
    pub fn new(optimization_id: OptimizationId, capacity: usize) -> (Self, broadcast::Receiver<ProgressEvent>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { optimization_id, sender, last_percentage: 0 }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Publishes `percentage` if it is one of the defined milestones and
    /// strictly greater than the last published value; otherwise a no-op.
    pub fn publish(&mut self, percentage: u8, message: impl Into<String>) {
        if !MILESTONES.contains(&percentage) || percentage <= self.last_percentage {
            return;
        }
        self.last_percentage = percentage;
        let _ = self.sender.send(ProgressEvent {
            optimization_id: self.optimization_id,
            percentage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}
