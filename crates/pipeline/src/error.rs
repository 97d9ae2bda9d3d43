use postframe_core::error::CoreError;
use postframe_core::mapping::MappingKind;

/// Errors raised while resolving, writing, or dispatching mappings.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A materialization batch kept failing. Earlier batches of the same
    /// run stay committed.
    #[error("Batch {batch_index} of {kind} mappings failed after {attempts} attempt(s): {source}")]
    BatchFailed {
        kind: MappingKind,
        batch_index: usize,
        attempts: u32,
        source: sqlx::Error,
    },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// SQLSTATE codes worth retrying: serialization failure, deadlock, a
/// foreign key violated by a concurrent delete, and server shutdown or
/// connection loss.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", "40P01", "23503", "57P01", "57P02", "57P03", "08000", "08001", "08003", "08004",
    "08006",
];

/// Whether a failed statement may succeed if the batch is run again.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)),
        _ => false,
    }
}
