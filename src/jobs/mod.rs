// src/jobs/mod.rs

pub mod command;
pub mod messages;
pub mod models;
pub mod packager;

// Re-export commonly used items for convenience
pub use command::Command;
pub use models::Job;
