//! Trigger layer: from "an entity was saved" to mapping work.
//!
//! [`TriggerDispatcher::on_entity_saved`] plans actions with
//! `postframe_core::trigger::plan_actions` and, per the configured
//! [`DispatchMode`], runs each one inline or queues it as a mapping job.
//! Failures end up in the [`DispatchReport`]; they never fail the save.

use std::sync::Arc;

use chrono::Utc;
use postframe_core::dispatch::DispatchMode;
use postframe_core::trigger::{plan_actions, EntitySaved, TriggerAction};
use postframe_core::types::{Date, DbId};
use postframe_db::repositories::MappingJobRepo;
use postframe_db::DbPool;
use postframe_events::PlatformEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::executor::{ActionExecutor, ActionOutcome};

// ---------------------------------------------------------------------------
// DispatchReport
// ---------------------------------------------------------------------------

/// How one planned action was handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    /// Ran to completion inside the triggering call.
    Inline { outcome: ActionOutcome },
    /// Handed to the worker as a mapping job.
    Queued { job_id: DbId },
    /// Could neither run nor be queued.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedAction {
    pub action: TriggerAction,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Everything one entity save set in motion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event: EntitySaved,
    pub actions: Vec<DispatchedAction>,
}

impl DispatchReport {
    pub fn has_failures(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a.disposition, Disposition::Failed { .. }))
    }

    pub fn queued_job_ids(&self) -> Vec<DbId> {
        self.actions
            .iter()
            .filter_map(|a| match a.disposition {
                Disposition::Queued { job_id } => Some(job_id),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TriggerDispatcher
// ---------------------------------------------------------------------------

pub struct TriggerDispatcher {
    executor: Arc<ActionExecutor>,
    mode: DispatchMode,
    inline_limit: u64,
    job_max_attempts: i32,
}

impl TriggerDispatcher {
    pub fn new(executor: Arc<ActionExecutor>, config: &PipelineConfig) -> Self {
        Self {
            executor,
            mode: config.dispatch_mode,
            inline_limit: config.inline_limit,
            job_max_attempts: config.job_max_attempts,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    pub fn pool(&self) -> &DbPool {
        self.executor.pool()
    }

    /// Plan and dispatch the mapping work for one save.
    pub async fn on_entity_saved(&self, event: &EntitySaved) -> DispatchReport {
        self.on_entity_saved_at(event, Utc::now().date_naive()).await
    }

    /// [`on_entity_saved`](Self::on_entity_saved) with an explicit date.
    pub async fn on_entity_saved_at(&self, event: &EntitySaved, today: Date) -> DispatchReport {
        let actions = plan_actions(event);
        tracing::debug!(
            entity_type = %event.entity_type,
            entity_id = event.entity_id,
            is_new = event.is_new,
            actions = actions.len(),
            "Entity saved"
        );

        let mut report = DispatchReport {
            event: event.clone(),
            actions: Vec::with_capacity(actions.len()),
        };
        for action in actions {
            let disposition = self.dispatch(&action, today).await;
            report.actions.push(DispatchedAction {
                action,
                disposition,
            });
        }
        report
    }

    async fn dispatch(&self, action: &TriggerAction, today: Date) -> Disposition {
        let inline = match self.mode {
            DispatchMode::Inline => true,
            DispatchMode::Queued => false,
            DispatchMode::Auto => match self.executor.estimate(action, today).await {
                Ok(estimate) => self.mode.runs_inline(estimate, self.inline_limit),
                Err(e) => {
                    tracing::warn!(action = action.name(), error = %e, "Fan-out estimate failed, queueing");
                    false
                }
            },
        };

        if !inline {
            return self.enqueue_or_fail(action).await;
        }

        match self.executor.execute(action, today).await {
            Ok(outcome) => Disposition::Inline { outcome },
            Err(e) => {
                tracing::error!(action = action.name(), error = %e, "Inline mapping action failed");
                if self.mode == DispatchMode::Auto {
                    // Replaying is safe, so let the worker finish the job.
                    self.enqueue_or_fail(action).await
                } else {
                    Disposition::Failed {
                        error: e.to_string(),
                    }
                }
            }
        }
    }

    async fn enqueue_or_fail(&self, action: &TriggerAction) -> Disposition {
        match self.enqueue(action).await {
            Ok(job_id) => Disposition::Queued { job_id },
            Err(e) => {
                tracing::error!(action = action.name(), error = %e, "Failed to queue mapping action");
                Disposition::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Queue `action` as a mapping job. Returns the job id.
    pub async fn enqueue(&self, action: &TriggerAction) -> Result<DbId, PipelineError> {
        let payload = serde_json::to_value(action)?;
        let job = MappingJobRepo::enqueue(
            self.executor.pool(),
            &payload,
            action.name(),
            self.job_max_attempts,
        )
        .await?;
        tracing::info!(job_id = job.id, action = action.name(), "Mapping job queued");
        Ok(job.id)
    }
}

// ---------------------------------------------------------------------------
// TriggerListener
// ---------------------------------------------------------------------------

/// Feeds `EntitySaved` events from the bus into a dispatcher.
pub struct TriggerListener;

impl TriggerListener {
    /// Run until `cancel` fires or the bus is dropped.
    pub async fn run(
        dispatcher: Arc<TriggerDispatcher>,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!(mode = %dispatcher.mode(), "Trigger listener started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Trigger listener stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(PlatformEvent::EntitySaved(event)) => {
                        let report = dispatcher.on_entity_saved(&event).await;
                        if report.has_failures() {
                            tracing::warn!(
                                entity_type = %event.entity_type,
                                entity_id = event.entity_id,
                                "Some mapping actions failed"
                            );
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Trigger listener lagged, some saves were not mapped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, trigger listener shutting down");
                        break;
                    }
                },
            }
        }
    }
}
