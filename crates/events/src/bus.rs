//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use postframe_core::mapping::{MappingKind, MaterializeResult};
use postframe_core::trigger::EntitySaved;
use postframe_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// Summary of one materialization, published after it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingsMaterialized {
    pub kind: MappingKind,
    /// Name of the action that produced the rows, e.g. `"map_post"`.
    pub trigger: String,
    /// Post or frame the action was about.
    pub subject_id: DbId,
    pub result: MaterializeResult,
    pub timestamp: DateTime<Utc>,
}

impl MappingsMaterialized {
    pub fn new(
        kind: MappingKind,
        trigger: impl Into<String>,
        subject_id: DbId,
        result: MaterializeResult,
    ) -> Self {
        Self {
            kind,
            trigger: trigger.into(),
            subject_id,
            result,
            timestamp: Utc::now(),
        }
    }
}

/// A domain event on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// An entity was durably saved; the trigger listener fans it out.
    EntitySaved(EntitySaved),
    /// A materialization committed.
    MappingsMaterialized(MappingsMaterialized),
}

impl PlatformEvent {
    /// Dot-separated event name for logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            PlatformEvent::EntitySaved(_) => "entity.saved",
            PlatformEvent::MappingsMaterialized(_) => "mappings.materialized",
        }
    }
}

impl From<EntitySaved> for PlatformEvent {
    fn from(event: EntitySaved) -> Self {
        PlatformEvent::EntitySaved(event)
    }
}

impl From<MappingsMaterialized> for PlatformEvent {
    fn from(event: MappingsMaterialized) -> Self {
        PlatformEvent::MappingsMaterialized(event)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PlatformEvent`].
///
/// # Usage
///
/// ```rust
/// use postframe_core::trigger::{EntitySaved, EntityType};
/// use postframe_events::bus::EventBus;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(EntitySaved::created(EntityType::Post, 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: impl Into<PlatformEvent>) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event.into());
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
