//! Customer entity.

use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub username: String,
    pub whatsapp_number: String,
    /// Maximum number of frames the customer may own.
    pub no_of_post: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a customer.
#[derive(Debug, Deserialize)]
pub struct CreateCustomer {
    pub username: String,
    pub whatsapp_number: String,
    pub no_of_post: Option<i32>,
}
