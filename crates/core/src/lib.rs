//! Tandem core data models.
//!
//! This crate defines the types shared by the workload generators, the
//! worker pool and the task group controllers.

#![warn(missing_docs)]

// Identities
mod id;

// Cancellation
mod scope;

// Submissions and their outcomes
mod submission;

// Errors and configuration
mod error;
mod config;

// Re-exports
pub use id::*;
pub use scope::CancelScope;
pub use submission::{Submission, Outcome, Completion};
pub use error::{WorkloadError, ConfigError};
pub use config::ControllerConfig;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
