// CylinderOps Server
//
// Main entry point for the CylinderOps operational backbone: assembles
// configuration, starts the sync engine's worker pool, and serves a minimal
// HTTP surface for health checks and manual dispatch triggers.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cylinderops_core::config::AppConfig;
use cylinderops_core::sync::worker::SyncExecutor;
use cylinderops_core::sync::SyncEngine;
use cylinderops_core::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_WORKER_COUNT: usize = 3;

/// Placeholder legacy-system boundary until a real one is wired in; always
/// reports a clean apply so the worker pool has something to drain against
/// in this deployment shape.
struct NoopLegacyExecutor;

#[async_trait::async_trait]
impl SyncExecutor for NoopLegacyExecutor {
    async fn apply(&self, _op: &cylinderops_core::domain::SyncOperation) -> Result<Option<Value>> {
        Ok(None)
    }
}

#[derive(Clone)]
struct AppState {
    sync: SyncEngine,
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn sync_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "customer_sync": state.sync.metrics(cylinderops_core::domain::EntityType::Customer),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).with_thread_ids(true).with_level(true).init();

    let config = AppConfig::from_env();
    config.validate()?;

    info!(environment = ?config.environment, "starting cylinderops server");

    let sync = SyncEngine::new();
    let executor: Arc<dyn SyncExecutor> = Arc::new(NoopLegacyExecutor);
    let _worker_handles = sync.spawn_workers(executor, DEFAULT_WORKER_COUNT);
    info!(worker_count = DEFAULT_WORKER_COUNT, "sync worker pool started");

    let state = AppState { sync };
    let app = Router::new().route("/healthz", get(healthz)).route("/sync/status", get(sync_status)).with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.map_err(|e| {
        error!(error = %e, "failed to bind server socket");
        cylinderops_core::CoreError::fatal(e.to_string())
    })?;
    info!("listening on 0.0.0.0:8080");
    axum::serve(listener, app).await.map_err(|e| cylinderops_core::CoreError::fatal(e.to_string()))?;

    Ok(())
}
