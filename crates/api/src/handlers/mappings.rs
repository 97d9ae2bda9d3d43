//! Handlers for reading mapping rows and flagging them downloaded.

use axum::extract::{Path, Query, State};
use postframe_core::error::CoreError;
use postframe_core::mapping::MappingKind;
use postframe_core::types::DbId;
use postframe_db::models::mapping::{MappingListQuery, MappingRow};
use postframe_db::repositories::MappingRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{data, DataJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerPostQuery {
    pub customer_id: DbId,
    pub post_id: DbId,
    /// Narrows the lookup when the customer has several frames.
    pub frame_id: Option<DbId>,
}

/// Parse the `{kind}` path segment.
pub fn parse_kind(kind: &str) -> AppResult<MappingKind> {
    kind.parse::<MappingKind>().map_err(AppError::Core)
}

/// GET /api/v1/mappings/{kind}?customer_id=&post_id=[&frame_id=]
///
/// The customer's mapping for one post. A customer with several frames
/// mapped to the post gets the oldest row unless `frame_id` picks one. 404
/// when no matching row exists.
pub async fn find_for_customer_post(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<CustomerPostQuery>,
) -> AppResult<DataJson<MappingRow>> {
    let kind = parse_kind(&kind)?;
    let row = MappingRepo::find_for_customer_post(
        &state.pool,
        kind,
        params.customer_id,
        params.post_id,
        params.frame_id,
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "mapping",
        id: params.post_id,
    }))?;
    Ok(data(row))
}

/// POST /api/v1/mappings/{kind}/{id}/downloaded
pub async fn mark_downloaded(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<DataJson<MappingRow>> {
    let kind = parse_kind(&kind)?;
    let row = MappingRepo::mark_downloaded(&state.pool, kind, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "mapping",
            id,
        }))?;
    tracing::debug!(kind = %kind, mapping_id = id, "Mapping marked downloaded");
    Ok(data(row))
}

/// GET /api/v1/customers/{id}/mappings/{kind}
pub async fn list_for_customer(
    State(state): State<AppState>,
    Path((customer_id, kind)): Path<(DbId, String)>,
    Query(params): Query<MappingListQuery>,
) -> AppResult<DataJson<Vec<MappingRow>>> {
    let kind = parse_kind(&kind)?;
    let rows = MappingRepo::list_for_customer(&state.pool, kind, customer_id, &params).await?;
    Ok(data(rows))
}
