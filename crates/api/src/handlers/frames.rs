//! Handlers for the `/frames` resource.
//!
//! Creating or editing a frame goes through `postframe_pipeline::frames`,
//! which validates the frame and dispatches its mapping work in one call.

use axum::extract::{Path, State};
use axum::Json;
use postframe_core::error::CoreError;
use postframe_core::types::DbId;
use postframe_db::models::customer_frame::{
    CreateCustomerFrame, CustomerFrame, UpdateCustomerFrame,
};
use postframe_db::models::mapping::MappingRow;
use postframe_db::repositories::{CustomerFrameRepo, MappingRepo};
use postframe_pipeline::frames::{create_customer_frame, update_customer_frame};
use postframe_pipeline::DispatchReport;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::mappings::parse_kind;
use crate::response::{created, data, Created, DataJson};
use crate::state::AppState;

/// A saved frame together with the mapping work its save set off.
#[derive(Debug, Serialize)]
pub struct FrameSaved {
    pub frame: CustomerFrame,
    pub dispatch: DispatchReport,
}

/// POST /api/v1/frames
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerFrame>,
) -> AppResult<Created<FrameSaved>> {
    let (frame, dispatch) = create_customer_frame(&state.dispatcher, &input).await?;
    Ok(created(FrameSaved { frame, dispatch }))
}

/// GET /api/v1/frames/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<DataJson<CustomerFrame>> {
    let frame = CustomerFrameRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "customer_frame",
            id,
        }))?;
    Ok(data(frame))
}

/// PATCH /api/v1/frames/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCustomerFrame>,
) -> AppResult<DataJson<FrameSaved>> {
    let (frame, dispatch) = update_customer_frame(&state.dispatcher, id, &input).await?;
    Ok(data(FrameSaved { frame, dispatch }))
}

/// GET /api/v1/frames/{id}/mappings/{kind}
pub async fn list_mappings(
    State(state): State<AppState>,
    Path((id, kind)): Path<(DbId, String)>,
) -> AppResult<DataJson<Vec<MappingRow>>> {
    let kind = parse_kind(&kind)?;
    let rows = MappingRepo::list_for_frame(&state.pool, kind, id).await?;
    Ok(data(rows))
}
