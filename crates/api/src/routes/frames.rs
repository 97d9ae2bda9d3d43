//! Route definitions for the `/frames` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::frames;
use crate::state::AppState;

/// Routes mounted at `/frames`.
///
/// ```text
/// POST   /                       -> create
/// GET    /{id}                   -> get_by_id
/// PATCH  /{id}                   -> update
/// GET    /{id}/mappings/{kind}   -> list_mappings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(frames::create))
        .route("/{id}", get(frames::get_by_id).patch(frames::update))
        .route("/{id}/mappings/{kind}", get(frames::list_mappings))
}
