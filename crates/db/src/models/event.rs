//! Dated occasions that event posts are published for.

use postframe_core::media::MediaType;
use postframe_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub name: String,
    pub event_date: Option<Date>,
    pub media_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an event.
#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub event_date: Option<Date>,
    pub media_type: Option<MediaType>,
}
