//! Re-pointing plan for a frame that moved to another group.
//!
//! A stale event-post mapping is moved to the new group's post for the same
//! event, keeping the row id. Rows with no same-event post in the new group,
//! and rows whose replacement is already mapped for the frame, are removed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::eligibility::groups_match;
use crate::types::DbId;

/// An existing event-post mapping of one frame, joined with its post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    pub mapping_id: DbId,
    pub post_id: DbId,
    pub post_group_id: Option<DbId>,
    pub event_id: DbId,
}

/// What to do with a frame's stale event-post mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepointPlan {
    /// `(mapping_id, new_post_id)` pairs to update in place.
    pub repoint: Vec<(DbId, DbId)>,
    /// Mapping ids to delete.
    pub remove: Vec<DbId>,
}

impl RepointPlan {
    pub fn is_empty(&self) -> bool {
        self.repoint.is_empty() && self.remove.is_empty()
    }
}

/// Links whose post no longer belongs to the frame's group.
pub fn stale_links(frame_group_id: Option<DbId>, links: &[PostLink]) -> Vec<&PostLink> {
    links
        .iter()
        .filter(|l| !groups_match(l.post_group_id, frame_group_id))
        .collect()
}

/// Distinct event ids referenced by the stale links, ascending.
pub fn stale_event_ids(frame_group_id: Option<DbId>, links: &[PostLink]) -> Vec<DbId> {
    let mut ids: Vec<DbId> = stale_links(frame_group_id, links)
        .into_iter()
        .map(|l| l.event_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    ids.sort_unstable();
    ids
}

/// Build the re-pointing plan.
///
/// `replacements` maps an event id to the post of the frame's new group for
/// that event (at most one per event and group). Stale links are processed
/// in mapping-id order so the plan is deterministic.
pub fn plan_repoint(
    frame_group_id: Option<DbId>,
    links: &[PostLink],
    replacements: &HashMap<DbId, DbId>,
) -> RepointPlan {
    let mut claimed: HashSet<DbId> = links
        .iter()
        .filter(|l| groups_match(l.post_group_id, frame_group_id))
        .map(|l| l.post_id)
        .collect();

    let mut stale = stale_links(frame_group_id, links);
    stale.sort_by_key(|l| l.mapping_id);

    let mut plan = RepointPlan::default();
    for link in stale {
        match replacements.get(&link.event_id) {
            Some(&new_post_id) if claimed.insert(new_post_id) => {
                plan.repoint.push((link.mapping_id, new_post_id));
            }
            _ => plan.remove.push(link.mapping_id),
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
