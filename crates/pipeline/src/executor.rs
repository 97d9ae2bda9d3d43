//! Runs a single [`TriggerAction`] end to end.
//!
//! The inline dispatcher and the queue worker both go through
//! [`ActionExecutor::execute`], so an action behaves the same wherever it
//! runs. Every action is idempotent and safe to replay.

use std::collections::BTreeMap;
use std::sync::Arc;

use postframe_core::mapping::{MappingKind, MaterializeResult};
use postframe_core::trigger::TriggerAction;
use postframe_core::types::{Date, DbId};
use postframe_db::repositories::MappingRepo;
use postframe_db::DbPool;
use postframe_events::{EventBus, MappingsMaterialized};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fanout::FanOut;
use crate::materializer::Materializer;
use crate::reconciler::Reconciler;
use crate::resolver::Resolver;

/// What an executed action did. Stored as the job result for queued runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Materialization per kind.
    pub materialized: BTreeMap<MappingKind, MaterializeResult>,
    /// Event-post rows moved by a reconciliation.
    pub repointed: u64,
    /// Rows deleted by pruning or reconciliation.
    pub removed: u64,
    /// Rows re-opened by a content-change reset.
    pub reset: u64,
}

impl ActionOutcome {
    /// Materialization summed across kinds.
    pub fn total(&self) -> MaterializeResult {
        let mut total = MaterializeResult::default();
        for result in self.materialized.values() {
            total += *result;
        }
        total
    }
}

pub struct ActionExecutor {
    pool: DbPool,
    fanout: FanOut,
    reconciler: Reconciler,
    event_bus: Option<Arc<EventBus>>,
}

impl ActionExecutor {
    pub fn new(pool: DbPool, config: &PipelineConfig, event_bus: Option<Arc<EventBus>>) -> Self {
        let resolver = Resolver::new(pool.clone(), config.page_size);
        let materializer =
            Materializer::new(pool.clone(), config.batch_size, config.batch_retry.clone());
        let fanout = FanOut::new(resolver, materializer);
        let reconciler = Reconciler::new(pool.clone(), fanout.clone());
        Self {
            pool,
            fanout,
            reconciler,
            event_bus,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn resolver(&self) -> &Resolver {
        self.fanout.resolver()
    }

    pub fn materializer(&self) -> &Materializer {
        self.fanout.materializer()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run `action` with `today` as the cut-off for upcoming events.
    pub async fn execute(
        &self,
        action: &TriggerAction,
        today: Date,
    ) -> Result<ActionOutcome, PipelineError> {
        let mut outcome = ActionOutcome::default();
        let subject_id;

        match *action {
            TriggerAction::MapPost {
                kind,
                post_id,
                reset_downloads,
            } => {
                subject_id = post_id;
                if kind == MappingKind::BusinessPost {
                    outcome.removed += self.materializer().prune_business_for_post(post_id).await?;
                }
                let result = self.fanout.post(kind, post_id, reset_downloads).await?;
                outcome.reset = result.updated;
                outcome.materialized.insert(kind, result);
            }
            TriggerAction::MapFrame { frame_id } => {
                subject_id = frame_id;
                outcome.materialized = self
                    .fanout
                    .frame(frame_id, &MappingKind::ALL, today)
                    .await?;
            }
            TriggerAction::ReconcileFrameGroup { frame_id } => {
                subject_id = frame_id;
                let result = self.reconciler.reconcile_frame_group(frame_id, today).await?;
                outcome.repointed = result.repointed;
                outcome.removed = result.removed;
                outcome.materialized = result.by_kind;
            }
            TriggerAction::RefreshFrameBusiness { frame_id } => {
                subject_id = frame_id;
                outcome.removed += self.materializer().prune_business_for_frame(frame_id).await?;
                outcome.materialized = self
                    .fanout
                    .frame(frame_id, &[MappingKind::BusinessPost], today)
                    .await?;
            }
            TriggerAction::ResetFrameDownloads { frame_id } => {
                subject_id = frame_id;
                outcome.reset = self.materializer().reset_for_frame(frame_id).await?;
            }
            TriggerAction::ResetPostDownloads { kind, post_id } => {
                subject_id = post_id;
                outcome.reset = self.materializer().reset_for_post(kind, post_id).await?;
            }
        }

        self.publish(action, subject_id, &outcome);
        Ok(outcome)
    }

    fn publish(&self, action: &TriggerAction, subject_id: DbId, outcome: &ActionOutcome) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        for (kind, result) in &outcome.materialized {
            bus.publish(MappingsMaterialized::new(
                *kind,
                action.name(),
                subject_id,
                *result,
            ));
        }
    }

    /// Upper bound on how many rows `action` may touch; used to choose
    /// between inline and queued dispatch.
    pub async fn estimate(&self, action: &TriggerAction, today: Date) -> Result<u64, PipelineError> {
        let resolver = self.resolver();
        let estimate = match *action {
            TriggerAction::MapPost { kind, post_id, .. } => match resolver.load_post(kind, post_id).await? {
                Some(target) => resolver.estimate_post_fanout(&target).await?,
                None => 0,
            },
            TriggerAction::MapFrame { frame_id } => match resolver.load_frame(frame_id).await? {
                Some(frame) => {
                    resolver
                        .estimate_frame_fanout(&frame, &MappingKind::ALL, today)
                        .await?
                }
                None => 0,
            },
            TriggerAction::ReconcileFrameGroup { frame_id } => {
                let existing = self.count_for_frame(frame_id, &MappingKind::ALL).await?;
                let fanout = match resolver.load_frame(frame_id).await? {
                    Some(frame) => {
                        resolver
                            .estimate_frame_fanout(&frame, &MappingKind::ALL, today)
                            .await?
                    }
                    None => 0,
                };
                existing + fanout
            }
            TriggerAction::RefreshFrameBusiness { frame_id } => {
                let existing = self
                    .count_for_frame(frame_id, &[MappingKind::BusinessPost])
                    .await?;
                let fanout = match resolver.load_frame(frame_id).await? {
                    Some(frame) => {
                        resolver
                            .estimate_frame_fanout(&frame, &[MappingKind::BusinessPost], today)
                            .await?
                    }
                    None => 0,
                };
                existing + fanout
            }
            // A reset is a single UPDATE statement.
            TriggerAction::ResetFrameDownloads { .. } | TriggerAction::ResetPostDownloads { .. } => 0,
        };
        Ok(estimate)
    }

    async fn count_for_frame(&self, frame_id: DbId, kinds: &[MappingKind]) -> Result<u64, PipelineError> {
        let mut total = 0i64;
        for &kind in kinds {
            total += MappingRepo::count_for_frame(&self.pool, kind, frame_id).await?;
        }
        Ok(total.max(0) as u64)
    }
}
