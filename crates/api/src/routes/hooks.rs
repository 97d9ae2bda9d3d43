//! Route definitions for the `/hooks` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::hooks;
use crate::state::AppState;

/// Routes mounted at `/hooks`.
///
/// ```text
/// POST   /entity-saved    -> entity_saved  (?wait=true|false)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/entity-saved", post(hooks::entity_saved))
}
