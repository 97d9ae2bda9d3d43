//! Background subscriber that writes every bus event to the log.
//!
//! Materialization summaries are the pipeline's main observable output;
//! this gives them a structured log line even when nothing else listens.

use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

pub struct EventLog;

impl EventLog {
    /// Run the logging loop until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::record(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
    }

    fn record(event: &PlatformEvent) {
        match event {
            PlatformEvent::EntitySaved(saved) => {
                tracing::debug!(
                    event_type = event.event_type(),
                    entity_type = %saved.entity_type,
                    entity_id = saved.entity_id,
                    is_new = saved.is_new,
                    "Entity saved"
                );
            }
            PlatformEvent::MappingsMaterialized(m) => {
                tracing::info!(
                    event_type = event.event_type(),
                    kind = %m.kind,
                    trigger = %m.trigger,
                    subject_id = m.subject_id,
                    created = m.result.created,
                    updated = m.result.updated,
                    skipped = m.result.skipped,
                    "Mappings materialized"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use postframe_core::trigger::{EntitySaved, EntityType};

    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn log_loop_exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLog::run(bus.subscribe()));

        bus.publish(EntitySaved::created(EntityType::Post, 1));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("log loop should stop")
            .unwrap();
    }
}
