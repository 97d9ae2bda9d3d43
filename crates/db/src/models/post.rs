//! Post entities of the three kinds that fan out into mappings.

use postframe_core::eligibility::BusinessFacet;
use postframe_core::media::MediaType;
use postframe_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Event posts
// ---------------------------------------------------------------------------

/// A row from the `posts` table (one per event and group).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: DbId,
    pub event_id: DbId,
    pub group_id: Option<DbId>,
    pub media_type: String,
    pub file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an event post.
#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub event_id: DbId,
    pub group_id: Option<DbId>,
    pub media_type: Option<MediaType>,
    pub file_path: String,
}

/// An event post id together with its event's date, as used when paging
/// eligible posts for a frame.
#[derive(Debug, Clone, FromRow)]
pub struct DatedPostRef {
    pub id: DbId,
    pub group_id: Option<DbId>,
    pub event_date: Option<Date>,
}

// ---------------------------------------------------------------------------
// Other posts
// ---------------------------------------------------------------------------

/// A row from the `other_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OtherPost {
    pub id: DbId,
    pub category_id: DbId,
    pub group_id: Option<DbId>,
    pub name: String,
    pub media_type: String,
    pub file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an other post.
#[derive(Debug, Deserialize)]
pub struct CreateOtherPost {
    pub category_id: DbId,
    pub group_id: Option<DbId>,
    pub name: String,
    pub media_type: Option<MediaType>,
    pub file_path: String,
}

// ---------------------------------------------------------------------------
// Business posts
// ---------------------------------------------------------------------------

/// A row from the `business_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BusinessPost {
    pub id: DbId,
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
    pub media_type: String,
    pub file_path: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BusinessPost {
    pub fn facet(&self) -> BusinessFacet {
        BusinessFacet {
            id: self.id,
            group_id: self.group_id,
            profession_type: self.profession_type.clone(),
            business_category_id: self.business_category_id,
        }
    }
}

/// DTO for creating a business post.
#[derive(Debug, Deserialize)]
pub struct CreateBusinessPost {
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
    pub media_type: Option<MediaType>,
    pub file_path: String,
}

/// DTO for updating a business post. `None` leaves a column untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBusinessPost {
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
    pub file_path: Option<String>,
}
