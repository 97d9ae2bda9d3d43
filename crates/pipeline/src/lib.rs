//! Postframe mapping pipeline.
//!
//! Turns entity saves into materialized frame mappings:
//!
//! - [`resolver::Resolver`]: pages through the frames or posts eligible for a
//!   saved post or frame.
//! - [`materializer::Materializer`]: writes mapping keys in bounded,
//!   retried, per-batch transactions.
//! - [`reconciler::Reconciler`]: repairs a frame's mappings after it moves
//!   to another group.
//! - [`executor::ActionExecutor`]: runs one [`TriggerAction`] end to end;
//!   shared by the inline path and the worker.
//! - [`trigger::TriggerDispatcher`]: plans actions for an entity save and
//!   runs or queues each one.
//! - [`frames`]: frame creation and update hooks that dispatch their own
//!   triggers.
//!
//! [`TriggerAction`]: postframe_core::trigger::TriggerAction

pub mod config;
pub mod error;
pub mod executor;
pub mod fanout;
pub mod frames;
pub mod materializer;
pub mod reconciler;
pub mod resolver;
pub mod trigger;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use executor::{ActionExecutor, ActionOutcome};
pub use reconciler::ReconcileResult;
pub use trigger::{DispatchReport, TriggerDispatcher, TriggerListener};
