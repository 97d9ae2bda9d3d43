//! Post categories and business categories.

use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `categories` table (scopes other posts).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub name: String,
}

/// A row from the `business_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BusinessCategory {
    pub id: DbId,
    pub name: String,
    pub profession_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a business category.
#[derive(Debug, Deserialize)]
pub struct CreateBusinessCategory {
    pub name: String,
    pub profession_type: String,
}
