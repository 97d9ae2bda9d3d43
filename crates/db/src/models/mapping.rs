//! Mapping rows shared by the three per-kind mapping tables.

use postframe_core::eligibility::{BusinessFacet, FrameFacet};
use postframe_core::reconcile::PostLink;
use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from any of the mapping tables.
///
/// The kind-specific post column is selected as `post_id`, so the same
/// struct serves every kind.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MappingRow {
    pub id: DbId,
    pub customer_id: DbId,
    pub post_id: DbId,
    pub customer_frame_id: DbId,
    pub is_downloaded: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for listing a customer's mappings.
#[derive(Debug, Default, Deserialize)]
pub struct MappingListQuery {
    pub is_downloaded: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 500.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// An event-post mapping joined with the post's group and event.
#[derive(Debug, Clone, FromRow)]
pub struct PostLinkRow {
    pub mapping_id: DbId,
    pub post_id: DbId,
    pub post_group_id: Option<DbId>,
    pub event_id: DbId,
}

impl From<PostLinkRow> for PostLink {
    fn from(row: PostLinkRow) -> Self {
        PostLink {
            mapping_id: row.mapping_id,
            post_id: row.post_id,
            post_group_id: row.post_group_id,
            event_id: row.event_id,
        }
    }
}

/// A mapping id joined with the group of its post (other posts).
#[derive(Debug, Clone, FromRow)]
pub struct GroupLinkRow {
    pub mapping_id: DbId,
    pub post_id: DbId,
    pub post_group_id: Option<DbId>,
}

/// A business mapping of one frame, joined with its business post.
#[derive(Debug, Clone, FromRow)]
pub struct BusinessLinkRow {
    pub mapping_id: DbId,
    pub post_id: DbId,
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
}

impl BusinessLinkRow {
    pub fn facet(&self) -> BusinessFacet {
        BusinessFacet {
            id: self.post_id,
            group_id: self.group_id,
            profession_type: self.profession_type.clone(),
            business_category_id: self.business_category_id,
        }
    }
}

/// A business mapping of one post, joined with its frame.
#[derive(Debug, Clone, FromRow)]
pub struct FrameLinkRow {
    pub mapping_id: DbId,
    pub frame_id: DbId,
    pub customer_id: DbId,
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
}

impl FrameLinkRow {
    pub fn facet(&self) -> FrameFacet {
        FrameFacet {
            id: self.frame_id,
            customer_id: self.customer_id,
            group_id: self.group_id,
            profession_type: self.profession_type.clone(),
            business_category_id: self.business_category_id,
        }
    }
}
