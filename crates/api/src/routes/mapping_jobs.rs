//! Route definitions for the `/mapping-jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::mapping_jobs;
use crate::state::AppState;

/// Routes mounted at `/mapping-jobs`.
///
/// ```text
/// GET    /               -> list  (?status_id, limit, offset)
/// GET    /{id}           -> get_by_id
/// POST   /{id}/replay    -> replay
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(mapping_jobs::list))
        .route("/{id}", get(mapping_jobs::get_by_id))
        .route("/{id}/replay", post(mapping_jobs::replay))
}
