//! Eligibility rules joining customer frames to posts.
//!
//! These predicates are the only definition of "frame F should have a mapping
//! to post P". The SQL lookups in the resolver pre-filter with equivalent
//! conditions, and every candidate is re-checked here before it is written,
//! so the database query and the Rust rule can never silently diverge.

use serde::{Deserialize, Serialize};

use crate::types::{Date, DbId};

/// The attributes of a customer frame that eligibility depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFacet {
    pub id: DbId,
    pub customer_id: DbId,
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
}

/// The attributes of a business post that eligibility depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessFacet {
    pub id: DbId,
    pub group_id: Option<DbId>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
}

/// Group equality where a missing group never matches anything, not even
/// another missing group.
pub fn groups_match(a: Option<DbId>, b: Option<DbId>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Whether an event dated `event_date` still counts as upcoming on `today`.
///
/// Undated events are never upcoming.
pub fn is_upcoming(event_date: Option<Date>, today: Date) -> bool {
    event_date.is_some_and(|d| d >= today)
}

/// Post / OtherPost rule: same group.
pub fn group_post_matches(frame: &FrameFacet, post_group_id: Option<DbId>) -> bool {
    groups_match(frame.group_id, post_group_id)
}

/// Event post rule from the frame side: same group and the event is upcoming.
///
/// The post side applies no date filter: a post being published is already
/// temporally valid.
pub fn event_post_matches_frame(
    frame: &FrameFacet,
    post_group_id: Option<DbId>,
    event_date: Option<Date>,
    today: Date,
) -> bool {
    group_post_matches(frame, post_group_id) && is_upcoming(event_date, today)
}

/// BusinessPost rule: same group, and every attribute the post specifies
/// must be equal on the frame. An attribute the post leaves empty matches
/// any frame.
pub fn business_post_matches(frame: &FrameFacet, post: &BusinessFacet) -> bool {
    if !groups_match(frame.group_id, post.group_id) {
        return false;
    }
    let profession_ok = match post.profession_type.as_deref() {
        None => true,
        Some(p) => frame.profession_type.as_deref() == Some(p),
    };
    let category_ok = match post.business_category_id {
        None => true,
        Some(c) => frame.business_category_id == Some(c),
    };
    profession_ok && category_ok
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
