//! Queued mapping jobs.

use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `mapping_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MappingJob {
    pub id: DbId,
    /// Serialized `TriggerAction`.
    pub action: serde_json::Value,
    pub action_name: String,
    pub status_id: StatusId,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_after: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for listing mapping jobs.
#[derive(Debug, Default, Deserialize)]
pub struct MappingJobListQuery {
    /// Filter by status ID (e.g. 1 = pending, 4 = failed).
    pub status_id: Option<StatusId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Outcome of one stale-claim sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaleRecovery {
    /// Jobs put back in the queue.
    pub requeued: u64,
    /// Jobs that had no attempts left and were failed.
    pub failed: u64,
}

impl StaleRecovery {
    pub fn total(&self) -> u64 {
        self.requeued + self.failed
    }
}
