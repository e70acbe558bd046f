//! Swappable handle to the active worker pool.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_core::{CancelScope, WorkloadError};
use tracing::info;

use crate::{normalize_size, PoolError, TaskHandle, WorkerPool};

/// Owns the one pool that accepts new submissions.
///
/// Resizing builds a new pool and swaps it in. The previous pool receives no
/// further jobs, finishes what it already has and lets its threads exit.
pub struct PoolHandle {
    active: Mutex<WorkerPool>,
    thread_name_prefix: String,
    live_workers: Arc<AtomicUsize>,
}

impl PoolHandle {
    /// Create the handle with an initial pool of `size` workers.
    pub fn new(size: NonZeroUsize, thread_name_prefix: impl Into<String>) -> Result<Self, PoolError> {
        let thread_name_prefix = thread_name_prefix.into();
        let live_workers = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(0, size, &thread_name_prefix, Arc::clone(&live_workers))?;

        Ok(Self {
            active: Mutex::new(pool),
            thread_name_prefix,
            live_workers,
        })
    }

    fn active(&self) -> MutexGuard<'_, WorkerPool> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the active pool with one of `requested` workers (at least 1).
    ///
    /// Never waits for or cancels work already dispatched. On failure the
    /// current pool stays active.
    pub fn resize(&self, requested: i64) -> Result<NonZeroUsize, PoolError> {
        let size = normalize_size(requested);

        let mut active = self.active();
        let generation = active.generation() + 1;
        let pool = WorkerPool::new(generation, size, &self.thread_name_prefix, Arc::clone(&self.live_workers))?;
        let previous = std::mem::replace(&mut *active, pool);
        drop(active);

        info!(
            "Resized worker pool: {} -> {} workers (pool #{} retired)",
            previous.size(),
            size,
            previous.generation()
        );
        Ok(size)
    }

    /// Queue `work` on the active pool.
    pub fn submit<T, F>(&self, scope: &CancelScope, work: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce(&CancelScope) -> Result<T, WorkloadError> + Send + 'static,
    {
        self.active().submit(scope, work)
    }

    /// Worker count of the active pool.
    pub fn size(&self) -> NonZeroUsize {
        self.active().size()
    }

    /// Generation of the active pool; bumps on every resize.
    pub fn generation(&self) -> u64 {
        self.active().generation()
    }

    /// Worker threads still alive across the active and retired pools.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }
}
