//! Fixed-size thread pool.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use tandem_core::{CancelScope, WorkloadError};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Error type for pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The job queue is closed
    #[error("Worker pool has no workers left")]
    Closed,
}

/// Normalize a requested worker count; anything below 1 becomes 1.
pub fn normalize_size(requested: i64) -> NonZeroUsize {
    usize::try_from(requested)
        .ok()
        .and_then(NonZeroUsize::new)
        .unwrap_or(NonZeroUsize::MIN)
}

/// A fixed set of worker threads sharing one job queue.
///
/// Dropping the pool closes the queue. Workers finish whatever is already
/// queued and then exit, so a replaced pool drains on its own.
pub struct WorkerPool {
    generation: u64,
    size: NonZeroUsize,
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    /// Spawn `size` workers named `{prefix}-{generation}-{index}`.
    ///
    /// `live_workers` is incremented per spawned worker and decremented as
    /// each one exits.
    pub fn new(
        generation: u64,
        size: NonZeroUsize,
        prefix: &str,
        live_workers: Arc<AtomicUsize>,
    ) -> Result<Self, PoolError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        for index in 0..size.get() {
            let name = format!("{}-{}-{}", prefix, generation, index);
            let receiver = Arc::clone(&receiver);
            let live = Arc::clone(&live_workers);

            live.fetch_add(1, Ordering::SeqCst);
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&name, &receiver, &live));

            if let Err(e) = spawned {
                // Workers already spawned exit once `sender` drops here
                live_workers.fetch_sub(1, Ordering::SeqCst);
                return Err(PoolError::Spawn(e));
            }
        }

        info!("Created worker pool #{} with {} workers", generation, size);

        Ok(Self {
            generation,
            size,
            sender,
        })
    }

    /// Pool generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of workers.
    pub fn size(&self) -> NonZeroUsize {
        self.size
    }

    /// Queue `work` on one of the workers.
    ///
    /// The job runs under a child of `scope`. If that scope is already
    /// revoked when a worker picks the job up, `work` is skipped and the
    /// handle resolves to [`WorkloadError::Cancelled`]. A panic inside
    /// `work` resolves to [`WorkloadError::Panicked`].
    pub fn submit<T, F>(&self, scope: &CancelScope, work: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce(&CancelScope) -> Result<T, WorkloadError> + Send + 'static,
    {
        let scope = scope.child();
        let job_scope = scope.clone();
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            let result = if job_scope.is_revoked() {
                Err(WorkloadError::Cancelled)
            } else {
                panic::catch_unwind(AssertUnwindSafe(|| work(&job_scope)))
                    .unwrap_or_else(|payload| Err(WorkloadError::Panicked(panic_message(&*payload))))
            };
            // Receiver gone means nobody awaits the result
            let _ = tx.send(result);
        });

        self.sender.send(job).map_err(|_| PoolError::Closed)?;

        Ok(TaskHandle { scope, result: rx })
    }
}

fn worker_loop(name: &str, receiver: &Mutex<mpsc::Receiver<Job>>, live: &AtomicUsize) {
    loop {
        let job = match receiver.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };

        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }

    live.fetch_sub(1, Ordering::SeqCst);
    debug!("Worker {} drained and exiting", name);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Awaitable, cancellable handle to a job queued on a [`WorkerPool`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    scope: CancelScope,
    result: oneshot::Receiver<Result<T, WorkloadError>>,
}

impl<T> TaskHandle<T> {
    /// Revoke this job only. Sibling jobs under the same parent scope keep
    /// running.
    pub fn cancel(&self) {
        self.scope.revoke();
    }

    /// Wait for the job.
    ///
    /// Resolves to [`WorkloadError::Cancelled`] as soon as the job's scope is
    /// revoked, without waiting for the worker to reach its next safepoint.
    /// A result that is already available wins over a revocation.
    pub async fn join(self) -> Result<T, WorkloadError> {
        let TaskHandle { scope, result } = self;
        tokio::select! {
            biased;
            result = result => result.unwrap_or(Err(WorkloadError::PoolClosed)),
            _ = scope.revoked() => Err(WorkloadError::Cancelled),
        }
    }
}
