//! Queue consumer for mapping jobs.
//!
//! Polls `mapping_jobs` every `poll_interval` and drains whatever is due.
//! Claims go through [`MappingJobRepo::claim_next`] (`FOR UPDATE SKIP
//! LOCKED`), so any number of workers can run side by side.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use postframe_core::retry::RetryPolicy;
use postframe_core::trigger::TriggerAction;
use postframe_core::types::{Date, DbId};
use postframe_db::models::mapping_job::MappingJob;
use postframe_db::models::status::MappingJobStatus;
use postframe_db::repositories::MappingJobRepo;
use postframe_pipeline::{ActionExecutor, ActionOutcome, PipelineError};
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Result of processing one claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRun {
    Completed {
        job_id: DbId,
        outcome: ActionOutcome,
    },
    /// Failed and put back in the queue, or failed for good when out of
    /// attempts.
    Failed {
        job_id: DbId,
        status: Option<MappingJobStatus>,
        error: String,
    },
    /// The payload could not be decoded; never retried.
    Rejected { job_id: DbId, error: String },
}

pub struct MappingWorker {
    executor: Arc<ActionExecutor>,
    poll_interval: Duration,
    job_retry: RetryPolicy,
}

impl MappingWorker {
    pub fn new(executor: Arc<ActionExecutor>, config: &WorkerConfig) -> Self {
        Self {
            executor,
            poll_interval: config.poll_interval,
            job_retry: config.job_retry.clone(),
        }
    }

    /// Run the polling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Mapping worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Mapping worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain(&cancel).await {
                        tracing::error!(error = %e, "Mapping worker poll failed");
                    }
                }
            }
        }
    }

    /// Process due jobs until the queue is empty or shutdown is requested.
    async fn drain(&self, cancel: &CancellationToken) -> Result<(), PipelineError> {
        while !cancel.is_cancelled() {
            if self.run_once(Utc::now().date_naive()).await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Claim and process a single job. Returns `None` when nothing is due.
    pub async fn run_once(&self, today: Date) -> Result<Option<JobRun>, PipelineError> {
        let pool = self.executor.pool();
        let Some(job) = MappingJobRepo::claim_next(pool).await? else {
            return Ok(None);
        };
        tracing::debug!(
            job_id = job.id,
            action = %job.action_name,
            attempt = job.attempts,
            "Mapping job claimed",
        );

        let action: TriggerAction = match serde_json::from_value(job.action.clone()) {
            Ok(action) => action,
            Err(e) => {
                let error = format!("Undecodable action payload: {e}");
                tracing::error!(job_id = job.id, error = %error, "Rejecting mapping job");
                MappingJobRepo::fail(pool, job.id, &error).await?;
                return Ok(Some(JobRun::Rejected {
                    job_id: job.id,
                    error,
                }));
            }
        };

        match self.executor.execute(&action, today).await {
            Ok(outcome) => {
                MappingJobRepo::complete(pool, job.id, &serde_json::to_value(&outcome)?).await?;
                tracing::info!(
                    job_id = job.id,
                    action = action.name(),
                    created = outcome.total().created,
                    repointed = outcome.repointed,
                    removed = outcome.removed,
                    reset = outcome.reset,
                    "Mapping job completed",
                );
                Ok(Some(JobRun::Completed {
                    job_id: job.id,
                    outcome,
                }))
            }
            Err(e) => self.record_failure(&job, &action, e).await.map(Some),
        }
    }

    async fn record_failure(
        &self,
        job: &MappingJob,
        action: &TriggerAction,
        err: PipelineError,
    ) -> Result<JobRun, PipelineError> {
        let error = err.to_string();
        let attempt = u32::try_from(job.attempts).unwrap_or(1).max(1);
        let delay = self.job_retry.delay_for(attempt);
        let status = MappingJobRepo::fail_or_requeue(
            self.executor.pool(),
            job.id,
            &error,
            delay.as_secs_f64(),
        )
        .await?;

        match status {
            Some(MappingJobStatus::Failed) => tracing::error!(
                job_id = job.id,
                action = action.name(),
                attempts = job.attempts,
                error = %error,
                "Mapping job failed permanently",
            ),
            _ => tracing::warn!(
                job_id = job.id,
                action = action.name(),
                attempt = job.attempts,
                retry_in_secs = delay.as_secs(),
                error = %error,
                "Mapping job failed, will retry",
            ),
        }

        Ok(JobRun::Failed {
            job_id: job.id,
            status,
            error,
        })
    }
}
