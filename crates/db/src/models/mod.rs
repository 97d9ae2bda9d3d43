//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - An update DTO where the entity is mutable after creation

pub mod category;
pub mod customer;
pub mod customer_frame;
pub mod customer_group;
pub mod event;
pub mod mapping;
pub mod mapping_job;
pub mod post;
pub mod status;
