//! Entity-saved events and the mapping actions they trigger.
//!
//! [`plan_actions`] is the single authoritative table from "what was saved"
//! to "what the mapping pipeline must do". Both the inline dispatcher and the
//! queued worker execute the resulting [`TriggerAction`]s.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::mapping::MappingKind;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Field names reported in `changed_fields`
// ---------------------------------------------------------------------------

pub const FIELD_GROUP_ID: &str = "group_id";
pub const FIELD_FRAME_IMAGE: &str = "frame_image";
pub const FIELD_PROFESSION_TYPE: &str = "profession_type";
pub const FIELD_BUSINESS_CATEGORY_ID: &str = "business_category_id";
pub const FIELD_FILE_PATH: &str = "file_path";

// ---------------------------------------------------------------------------
// EntitySaved
// ---------------------------------------------------------------------------

/// Entity types whose saves feed the mapping pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Post,
    OtherPost,
    BusinessPost,
    CustomerFrame,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Post => "post",
            EntityType::OtherPost => "other_post",
            EntityType::BusinessPost => "business_post",
            EntityType::CustomerFrame => "customer_frame",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(EntityType::Post),
            "other_post" => Ok(EntityType::OtherPost),
            "business_post" => Ok(EntityType::BusinessPost),
            "customer_frame" => Ok(EntityType::CustomerFrame),
            other => Err(CoreError::Validation(format!(
                "Unknown entity type: \"{other}\""
            ))),
        }
    }
}

/// Notification that an entity was durably saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySaved {
    pub entity_type: EntityType,
    pub entity_id: DbId,
    pub is_new: bool,
    #[serde(default)]
    pub changed_fields: BTreeSet<String>,
}

impl EntitySaved {
    /// A freshly created entity.
    pub fn created(entity_type: EntityType, entity_id: DbId) -> Self {
        Self {
            entity_type,
            entity_id,
            is_new: true,
            changed_fields: BTreeSet::new(),
        }
    }

    /// An update of an existing entity touching `fields`.
    pub fn updated<I, S>(entity_type: EntityType, entity_id: DbId, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_type,
            entity_id,
            is_new: false,
            changed_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn changed(&self, field: &str) -> bool {
        self.changed_fields.contains(field)
    }
}

// ---------------------------------------------------------------------------
// TriggerAction
// ---------------------------------------------------------------------------

/// A unit of mapping work. Every variant is idempotent to re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TriggerAction {
    /// Fan a post of `kind` out to every eligible frame. With
    /// `reset_downloads`, mappings that already existed are re-opened too.
    MapPost {
        kind: MappingKind,
        post_id: DbId,
        #[serde(default)]
        reset_downloads: bool,
    },
    /// Fan a frame out to every eligible post of every kind.
    MapFrame { frame_id: DbId },
    /// Frame changed group: re-point, prune, then fill in.
    ReconcileFrameGroup { frame_id: DbId },
    /// Frame profession/category changed: prune and re-derive business rows.
    RefreshFrameBusiness { frame_id: DbId },
    /// Frame image changed: re-open every mapping of the frame.
    ResetFrameDownloads { frame_id: DbId },
    /// Post file changed: re-open every mapping of the post.
    ResetPostDownloads { kind: MappingKind, post_id: DbId },
}

impl TriggerAction {
    /// Short name for logs and job listings.
    pub fn name(&self) -> &'static str {
        match self {
            TriggerAction::MapPost { .. } => "map_post",
            TriggerAction::MapFrame { .. } => "map_frame",
            TriggerAction::ReconcileFrameGroup { .. } => "reconcile_frame_group",
            TriggerAction::RefreshFrameBusiness { .. } => "refresh_frame_business",
            TriggerAction::ResetFrameDownloads { .. } => "reset_frame_downloads",
            TriggerAction::ResetPostDownloads { .. } => "reset_post_downloads",
        }
    }
}

fn post_kind(entity_type: EntityType) -> Option<MappingKind> {
    match entity_type {
        EntityType::Post => Some(MappingKind::Post),
        EntityType::OtherPost => Some(MappingKind::OtherPost),
        EntityType::BusinessPost => Some(MappingKind::BusinessPost),
        EntityType::CustomerFrame => None,
    }
}

/// Translate a save notification into mapping actions.
///
/// - Post / OtherPost fan out on creation only; a later file change re-opens
///   their mappings.
/// - BusinessPost re-derives on every save, since editors may change the
///   profession or category after creation. A file change rides on the same
///   fan-out and re-opens the rows it keeps.
/// - A created frame fans out; an updated frame reconciles on group change,
///   refreshes business rows on profession/category change, and re-opens its
///   mappings on image change.
pub fn plan_actions(event: &EntitySaved) -> Vec<TriggerAction> {
    let id = event.entity_id;
    let mut actions = Vec::new();

    match event.entity_type {
        EntityType::BusinessPost => {
            actions.push(TriggerAction::MapPost {
                kind: MappingKind::BusinessPost,
                post_id: id,
                reset_downloads: !event.is_new && event.changed(FIELD_FILE_PATH),
            });
        }
        EntityType::Post | EntityType::OtherPost => {
            let Some(kind) = post_kind(event.entity_type) else {
                return actions;
            };
            if event.is_new {
                actions.push(TriggerAction::MapPost {
                    kind,
                    post_id: id,
                    reset_downloads: false,
                });
            } else if event.changed(FIELD_FILE_PATH) {
                actions.push(TriggerAction::ResetPostDownloads { kind, post_id: id });
            }
        }
        EntityType::CustomerFrame => {
            if event.is_new {
                actions.push(TriggerAction::MapFrame { frame_id: id });
                return actions;
            }
            if event.changed(FIELD_GROUP_ID) {
                actions.push(TriggerAction::ReconcileFrameGroup { frame_id: id });
            } else if event.changed(FIELD_PROFESSION_TYPE)
                || event.changed(FIELD_BUSINESS_CATEGORY_ID)
            {
                actions.push(TriggerAction::RefreshFrameBusiness { frame_id: id });
            }
            if event.changed(FIELD_FRAME_IMAGE) {
                actions.push(TriggerAction::ResetFrameDownloads { frame_id: id });
            }
        }
    }

    actions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
