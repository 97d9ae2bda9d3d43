//! Route definitions for the `/mappings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::mappings;
use crate::state::AppState;

/// Routes mounted at `/mappings`.
///
/// ```text
/// GET    /{kind}                  -> find_for_customer_post  (?customer_id, post_id, frame_id)
/// POST   /{kind}/{id}/downloaded  -> mark_downloaded
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(mappings::find_for_customer_post))
        .route("/{kind}/{id}/downloaded", post(mappings::mark_downloaded))
}
