//! Handlers for the `/mapping-jobs` resource: inspecting the queue the
//! worker drains and replaying jobs that ran out of attempts.

use axum::extract::{Path, Query, State};
use postframe_core::error::CoreError;
use postframe_core::types::DbId;
use postframe_db::models::mapping_job::{MappingJob, MappingJobListQuery};
use postframe_db::repositories::MappingJobRepo;

use crate::error::{AppError, AppResult};
use crate::response::{data, DataJson};
use crate::state::AppState;

/// GET /api/v1/mapping-jobs
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<MappingJobListQuery>,
) -> AppResult<DataJson<Vec<MappingJob>>> {
    let jobs = MappingJobRepo::list(&state.pool, &params).await?;
    Ok(data(jobs))
}

/// GET /api/v1/mapping-jobs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<DataJson<MappingJob>> {
    let job = MappingJobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "mapping_job",
            id,
        }))?;
    Ok(data(job))
}

/// POST /api/v1/mapping-jobs/{id}/replay
///
/// Requeue a failed job with a fresh attempt budget. 404 for an unknown job,
/// 409 for a job that is not in the Failed state.
pub async fn replay(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<DataJson<MappingJob>> {
    if let Some(job) = MappingJobRepo::replay(&state.pool, id).await? {
        tracing::info!(job_id = id, action = %job.action_name, "Mapping job replayed");
        return Ok(data(job));
    }

    match MappingJobRepo::find_by_id(&state.pool, id).await? {
        Some(_) => Err(AppError::Core(CoreError::Conflict(format!(
            "Mapping job {id} is not failed"
        )))),
        None => Err(AppError::Core(CoreError::NotFound {
            entity: "mapping_job",
            id,
        })),
    }
}
