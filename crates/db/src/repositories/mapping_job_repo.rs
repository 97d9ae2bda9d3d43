//! Repository for the `mapping_jobs` table: the durable queue behind
//! queued fan-out.
//!
//! Uses `MappingJobStatus` from `models::status` for every transition.

use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::mapping_job::{MappingJob, MappingJobListQuery, StaleRecovery};
use crate::models::status::{MappingJobStatus, StatusId};

/// Column list for `mapping_jobs` queries.
const COLUMNS: &str = "\
    id, action, action_name, status_id, attempts, max_attempts, run_after, \
    claimed_at, completed_at, last_error, result, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// `last_error` recorded when a claim goes stale.
pub const LOST_CLAIM_ERROR: &str = "worker lost claim";

pub struct MappingJobRepo;

impl MappingJobRepo {
    /// Queue an action for the worker.
    pub async fn enqueue(
        pool: &PgPool,
        action: &serde_json::Value,
        action_name: &str,
        max_attempts: i32,
    ) -> Result<MappingJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO mapping_jobs (action, action_name, status_id, max_attempts) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MappingJob>(&query)
            .bind(action)
            .bind(action_name)
            .bind(MappingJobStatus::Pending.id())
            .bind(max_attempts)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest due pending job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same job. Claiming counts as an attempt.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<MappingJob>, sqlx::Error> {
        let query = format!(
            "UPDATE mapping_jobs \
             SET status_id = $1, claimed_at = NOW(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM mapping_jobs \
                 WHERE status_id = $2 AND run_after <= NOW() \
                 ORDER BY run_after ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MappingJob>(&query)
            .bind(MappingJobStatus::Running.id())
            .bind(MappingJobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a job completed with its result payload.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE mapping_jobs \
             SET status_id = $2, result = $3, completed_at = NOW(), last_error = NULL \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(MappingJobStatus::Completed.id())
        .bind(result)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// The job goes back to Pending, due after `retry_delay_secs`, unless it
    /// has used all its attempts, in which case it stays Failed until
    /// replayed. Returns the resulting status.
    pub async fn fail_or_requeue(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        retry_delay_secs: f64,
    ) -> Result<Option<MappingJobStatus>, sqlx::Error> {
        let status: Option<StatusId> = sqlx::query_scalar(
            "UPDATE mapping_jobs SET \
                status_id = CASE WHEN attempts >= max_attempts THEN $3 ELSE $4 END, \
                run_after = CASE WHEN attempts >= max_attempts THEN run_after \
                    ELSE NOW() + make_interval(secs => $5) END, \
                completed_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END, \
                claimed_at = NULL, \
                last_error = $2 \
             WHERE id = $1 \
             RETURNING status_id",
        )
        .bind(job_id)
        .bind(error)
        .bind(MappingJobStatus::Failed.id())
        .bind(MappingJobStatus::Pending.id())
        .bind(retry_delay_secs)
        .fetch_optional(pool)
        .await?;
        Ok(status.and_then(MappingJobStatus::from_id))
    }

    /// Fail a job outright, regardless of its remaining attempts.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE mapping_jobs \
             SET status_id = $2, last_error = $3, completed_at = NOW(), claimed_at = NULL \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(MappingJobStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Release jobs stuck in Running for longer than `older_than_secs`.
    ///
    /// The lost claim counts as a failed attempt: a job with attempts left
    /// returns to Pending, one without is failed and waits for replay.
    pub async fn recover_stale(
        pool: &PgPool,
        older_than_secs: i64,
    ) -> Result<StaleRecovery, sqlx::Error> {
        let statuses: Vec<StatusId> = sqlx::query_scalar(
            "UPDATE mapping_jobs SET \
                status_id = CASE WHEN attempts >= max_attempts THEN $1 ELSE $2 END, \
                completed_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END, \
                run_after = NOW(), \
                claimed_at = NULL, \
                last_error = $4 \
             WHERE status_id = $3 \
               AND claimed_at < NOW() - make_interval(secs => $5::DOUBLE PRECISION) \
             RETURNING status_id",
        )
        .bind(MappingJobStatus::Failed.id())
        .bind(MappingJobStatus::Pending.id())
        .bind(MappingJobStatus::Running.id())
        .bind(LOST_CLAIM_ERROR)
        .bind(older_than_secs as f64)
        .fetch_all(pool)
        .await?;

        let failed = statuses
            .iter()
            .filter(|&&id| id == MappingJobStatus::Failed.id())
            .count() as u64;
        Ok(StaleRecovery {
            requeued: statuses.len() as u64 - failed,
            failed,
        })
    }

    /// Put a failed job back in the queue with a fresh attempt budget.
    pub async fn replay(pool: &PgPool, job_id: DbId) -> Result<Option<MappingJob>, sqlx::Error> {
        let query = format!(
            "UPDATE mapping_jobs \
             SET status_id = $2, attempts = 0, run_after = NOW(), \
                 claimed_at = NULL, completed_at = NULL \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MappingJob>(&query)
            .bind(job_id)
            .bind(MappingJobStatus::Pending.id())
            .bind(MappingJobStatus::Failed.id())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MappingJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM mapping_jobs WHERE id = $1");
        sqlx::query_as::<_, MappingJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        params: &MappingJobListQuery,
    ) -> Result<Vec<MappingJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM mapping_jobs \
             WHERE ($1::SMALLINT IS NULL OR status_id = $1) \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, MappingJob>(&query)
            .bind(params.status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Number of jobs that are Pending or Running.
    pub async fn count_open(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM mapping_jobs WHERE status_id IN ($1, $2)")
            .bind(MappingJobStatus::Pending.id())
            .bind(MappingJobStatus::Running.id())
            .fetch_one(pool)
            .await
    }
}
