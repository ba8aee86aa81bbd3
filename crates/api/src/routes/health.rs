//! Liveness probe, mounted at the root rather than under `/api/v1`.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub pool_size: u32,
    pub pool_idle: usize,
    /// Seconds between background repair sweeps; 0 when disabled.
    pub repair_interval_secs: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let db_healthy = coursepath_db::health_check(&state.pool).await.is_ok();
    if !db_healthy {
        tracing::warn!("Health probe could not reach the database");
    }

    Json(HealthReport {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        pool_size: state.pool.size(),
        pool_idle: state.pool.num_idle(),
        repair_interval_secs: state.config.repair_interval_secs,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
