//! Repository for the `events` table.

use postframe_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::event::{CreateEvent, Event};

/// Column list for `events` queries.
const COLUMNS: &str = "id, name, event_date, media_type, created_at, updated_at";

pub struct EventRepo;

impl EventRepo {
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (name, event_date, media_type) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(&input.name)
            .bind(input.event_date)
            .bind(input.media_type.unwrap_or_default().as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every event dated before `today`.
    ///
    /// Posts and their mappings go with them via `ON DELETE CASCADE`.
    /// Undated events are kept. Returns the number of events removed.
    pub async fn delete_past(pool: &PgPool, today: Date) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE event_date < $1")
            .bind(today)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
