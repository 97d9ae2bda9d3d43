//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod category_repo;
pub mod customer_frame_repo;
pub mod customer_group_repo;
pub mod customer_repo;
pub mod event_repo;
pub mod mapping_job_repo;
pub mod mapping_repo;
pub mod post_repo;

pub use category_repo::CategoryRepo;
pub use customer_frame_repo::CustomerFrameRepo;
pub use customer_group_repo::CustomerGroupRepo;
pub use customer_repo::CustomerRepo;
pub use event_repo::EventRepo;
pub use mapping_job_repo::MappingJobRepo;
pub use mapping_repo::MappingRepo;
pub use post_repo::{BusinessPostRepo, OtherPostRepo, PostRepo};
