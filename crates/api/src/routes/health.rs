use axum::extract::State;
use axum::{routing::get, Json, Router};
use postframe_db::repositories::MappingJobRepo;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// How entity saves are mapped (`inline`, `queued` or `auto`).
    pub dispatch_mode: String,
    /// Mapping jobs pending or running; `None` when the database is down.
    pub open_jobs: Option<i64>,
}

/// GET /health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = postframe_db::health_check(&state.pool).await.is_ok();
    let open_jobs = if db_healthy {
        MappingJobRepo::count_open(&state.pool).await.ok()
    } else {
        None
    };

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        dispatch_mode: state.dispatcher.mode().to_string(),
        open_jobs,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
