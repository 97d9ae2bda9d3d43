//! Postframe domain core.
//!
//! Pure types, constants, and rules shared by every other crate. Nothing in
//! here touches the database or the network, so all of it is unit-tested in
//! place.

pub mod dispatch;
pub mod eligibility;
pub mod error;
pub mod frame_rules;
pub mod mapping;
pub mod media;
pub mod reconcile;
pub mod retry;
pub mod trigger;
pub mod types;
