//! Dispatch Orchestrator (spec §4.D): turns solver output into persisted
//! Routes, balances workload across vehicles, streams progress, and gates
//! order creation on customer credit.

pub mod balancer;
pub mod credit;
pub mod orchestrator;
pub mod progress;

pub use orchestrator::{orchestrate, resolve_status_update, OptimizationOutcome, OptimizationStatus, StopStatusUpdate};
pub use progress::{ProgressEvent, ProgressPublisher};
