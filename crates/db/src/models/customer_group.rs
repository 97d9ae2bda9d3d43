//! Customer group entity: the partition joining frames to posts.

use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customer_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerGroup {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a customer group.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerGroup {
    pub name: String,
}
