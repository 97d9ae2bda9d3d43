//! Handlers for the `/hooks` resource.
//!
//! The entry point for services that persist posts and frames themselves:
//! they report each save here and the mapping pipeline takes it from there.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use postframe_core::trigger::EntitySaved;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::data;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HookQuery {
    /// Dispatch before responding. `false` hands the save to the trigger
    /// listener and answers 202 straight away. Defaults to
    /// `ServerConfig::hook_wait_default`.
    pub wait: Option<bool>,
}

/// POST /api/v1/hooks/entity-saved
///
/// When waiting, plans and dispatches the mapping actions and
/// returns the dispatch report. Action failures are reported in the body;
/// the save itself is never rejected because of them.
pub async fn entity_saved(
    State(state): State<AppState>,
    Query(params): Query<HookQuery>,
    Json(event): Json<EntitySaved>,
) -> AppResult<Response> {
    if !params.wait.unwrap_or(state.config.hook_wait_default) {
        tracing::debug!(
            entity_type = %event.entity_type,
            entity_id = event.entity_id,
            "Entity save published"
        );
        state.event_bus.publish(event);
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let report = state.dispatcher.on_entity_saved(&event).await;
    if report.has_failures() {
        tracing::warn!(
            entity_type = %event.entity_type,
            entity_id = event.entity_id,
            "Entity save dispatched with failures"
        );
    }
    Ok(data(report).into_response())
}
