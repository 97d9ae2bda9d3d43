pub mod customers;
pub mod frames;
pub mod health;
pub mod hooks;
pub mod mapping_jobs;
pub mod mappings;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /hooks
///     POST   /entity-saved                       (?wait=true|false)
///
/// /frames
///     POST   /                                   create frame + fan out
///     GET    /{id}                               get frame
///     PATCH  /{id}                               update frame + reconcile
///     GET    /{id}/mappings/{kind}               frame's mappings of a kind
///
/// /customers
///     GET    /{id}/mappings/{kind}               (?is_downloaded, limit, offset)
///
/// /mappings
///     GET    /{kind}                             (?customer_id, post_id)
///     POST   /{kind}/{id}/downloaded             mark downloaded
///
/// /mapping-jobs
///     GET    /                                   (?status_id, limit, offset)
///     GET    /{id}                               get job
///     POST   /{id}/replay                        requeue a failed job
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/hooks", hooks::router())
        .nest("/frames", frames::router())
        .nest("/customers", customers::router())
        .nest("/mappings", mappings::router())
        .nest("/mapping-jobs", mapping_jobs::router())
}
