//! Task group control - two independently cancellable groups of blocking
//! work sharing one resizable worker pool.
//!
//! ```text
//! submit(m) → count+1 → pool.submit → await → classify → count-1 → republish
//! ```

#![warn(missing_docs)]

pub mod publisher;
pub mod state;
pub mod group;
pub mod controller;

pub use publisher::AggregatePublisher;
pub use state::{StateStore, GroupSnapshot};
pub use group::TaskGroupController;
pub use controller::{Controller, ControllerError, ControllerSnapshot};
