//! Worker pool - bounded, replaceable execution context for blocking work.

#![warn(missing_docs)]

pub mod pool;
pub mod handle;

pub use pool::{WorkerPool, TaskHandle, PoolError, normalize_size};
pub use handle::PoolHandle;
