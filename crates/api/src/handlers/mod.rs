pub mod frames;
pub mod hooks;
pub mod mapping_jobs;
pub mod mappings;
