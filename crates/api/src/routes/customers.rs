//! Route definitions for the `/customers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::mappings;
use crate::state::AppState;

/// Routes mounted at `/customers`.
///
/// ```text
/// GET    /{id}/mappings/{kind}   -> list_for_customer  (?is_downloaded, limit, offset)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/mappings/{kind}", get(mappings::list_for_customer))
}
