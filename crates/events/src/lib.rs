//! Postframe event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: entity saves flowing into the mapping pipeline and
//!   materialization summaries flowing out of it.
//! - [`EventLog`]: background subscriber writing every event to the log.

pub mod bus;
pub mod log;

pub use bus::{EventBus, MappingsMaterialized, PlatformEvent};
pub use log::EventLog;
