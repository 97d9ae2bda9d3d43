//! Mapping reconciler: repairs a frame's mappings after a group change.
//!
//! Event-post rows pointing into the old group are moved to the new group's
//! post for the same event (row id kept, download flag cleared). Rows with
//! no counterpart, or whose counterpart is already mapped, are deleted.
//! Other-post and business rows that are no longer eligible are deleted.
//! Finally the frame is fanned out so it is complete for its new group.

use std::collections::{BTreeMap, HashMap};

use postframe_core::mapping::{MappingKind, MaterializeResult};
use postframe_core::reconcile::{plan_repoint, stale_event_ids, PostLink};
use postframe_core::types::{Date, DbId};
use postframe_db::repositories::{CustomerFrameRepo, MappingRepo, PostRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::fanout::FanOut;
use crate::materializer::{prune_business_for_frame_in_tx, prune_other_for_group};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// Event-post rows moved to the new group's post.
    pub repointed: u64,
    /// Rows deleted across all kinds.
    pub removed: u64,
    /// Fan-out for the new group, summed across kinds.
    pub materialized: MaterializeResult,
    /// The same fan-out per kind.
    pub by_kind: BTreeMap<MappingKind, MaterializeResult>,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: PgPool,
    fanout: FanOut,
}

impl Reconciler {
    pub fn new(pool: PgPool, fanout: FanOut) -> Self {
        Self { pool, fanout }
    }

    /// Bring a frame's mappings in line with its current group.
    ///
    /// Safe to run any number of times; a second run finds nothing stale.
    /// A deleted frame reconciles to an empty result.
    pub async fn reconcile_frame_group(
        &self,
        frame_id: DbId,
        today: Date,
    ) -> Result<ReconcileResult, PipelineError> {
        let mut result = ReconcileResult::default();

        let mut tx = self.pool.begin().await?;
        let Some(frame) = CustomerFrameRepo::lock_by_id(&mut tx, frame_id).await? else {
            tracing::debug!(frame_id, "Frame vanished before reconciliation");
            return Ok(result);
        };
        let group_id = frame.group_id;

        // Event posts: re-point or drop.
        let links: Vec<PostLink> = MappingRepo::post_links_for_frame(&mut tx, frame_id)
            .await?
            .into_iter()
            .map(PostLink::from)
            .collect();
        let event_ids = stale_event_ids(group_id, &links);
        let replacements: HashMap<DbId, DbId> = match group_id {
            Some(group_id) if !event_ids.is_empty() => {
                PostRepo::find_in_group_for_events(&mut tx, group_id, &event_ids)
                    .await?
                    .into_iter()
                    .collect()
            }
            _ => HashMap::new(),
        };
        let plan = plan_repoint(group_id, &links, &replacements);

        if !plan.repoint.is_empty() {
            let (mapping_ids, post_ids): (Vec<DbId>, Vec<DbId>) =
                plan.repoint.iter().copied().unzip();
            result.repointed = MappingRepo::repoint(&mut tx, &mapping_ids, &post_ids).await?;
        }
        result.removed += MappingRepo::delete_by_ids(&mut tx, MappingKind::Post, &plan.remove).await?;

        // Other and business posts: drop what no longer applies.
        result.removed += prune_other_for_group(&mut tx, frame_id, group_id).await?;
        result.removed += prune_business_for_frame_in_tx(&mut tx, frame_id).await?;

        tx.commit().await?;

        // Fill in everything the new group offers.
        result.by_kind = self.fanout.frame(frame_id, &MappingKind::ALL, today).await?;
        for materialized in result.by_kind.values() {
            result.materialized += *materialized;
        }

        tracing::info!(
            frame_id,
            group_id = ?group_id,
            repointed = result.repointed,
            removed = result.removed,
            created = result.materialized.created,
            "Reconciled frame group"
        );
        Ok(result)
    }
}
