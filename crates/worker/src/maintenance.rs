//! Periodic upkeep run next to the mapping worker.
//!
//! - Stale claim recovery: jobs left Running by a crashed worker go back to
//!   Pending.
//! - Past-event purge: events dated before today are deleted. Their posts
//!   and mappings go with them through `ON DELETE CASCADE`.

use std::time::Duration;

use chrono::Utc;
use postframe_core::types::Date;
use postframe_db::repositories::{EventRepo, MappingJobRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run the stale claim recovery loop until `cancel` is triggered.
pub async fn run_stale_recovery(
    pool: PgPool,
    every: Duration,
    stale_after: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = every.as_secs(),
        stale_after_secs = stale_after.as_secs(),
        "Stale job recovery started"
    );

    let mut interval = tokio::time::interval(every);
    let older_than_secs = i64::try_from(stale_after.as_secs()).unwrap_or(i64::MAX);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stale job recovery stopping");
                break;
            }
            _ = interval.tick() => {
                match MappingJobRepo::recover_stale(&pool, older_than_secs).await {
                    Ok(recovery) if recovery.total() == 0 => {
                        tracing::debug!("Stale job recovery: nothing to recover");
                    }
                    Ok(recovery) => {
                        tracing::warn!(
                            requeued = recovery.requeued,
                            failed = recovery.failed,
                            "Stale job recovery: released abandoned jobs"
                        );
                    }
                    Err(e) => tracing::error!(error = %e, "Stale job recovery failed"),
                }
            }
        }
    }
}

/// Delete events dated before `today`. Returns the number removed.
pub async fn purge_past_events(pool: &PgPool, today: Date) -> Result<u64, sqlx::Error> {
    let deleted = EventRepo::delete_past(pool, today).await?;
    if deleted > 0 {
        tracing::info!(deleted, %today, "Event purge: removed past events");
    } else {
        tracing::debug!(%today, "Event purge: no past events");
    }
    Ok(deleted)
}

/// Run the past-event purge loop until `cancel` is triggered.
pub async fn run_event_purge(pool: PgPool, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Event purge started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Event purge stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = purge_past_events(&pool, Utc::now().date_naive()).await {
                    tracing::error!(error = %e, "Event purge failed");
                }
            }
        }
    }
}
