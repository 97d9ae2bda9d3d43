//! Postframe mapping worker.
//!
//! Drains the `mapping_jobs` queue through the same
//! [`ActionExecutor`](postframe_pipeline::ActionExecutor) the inline path
//! uses, and runs the maintenance loops that keep the queue and the event
//! calendar tidy.

pub mod config;
pub mod maintenance;
pub mod runner;

pub use config::WorkerConfig;
pub use runner::{JobRun, MappingWorker};
