//! Boundary operations for the presentation layer.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tandem_core::{Completion, ConfigError, ControllerConfig, GroupId, SubmissionId};
use tandem_pool::{normalize_size, PoolError, PoolHandle};
use tandem_workload::{BubbleSortLast, FibonacciAggregate};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::{GroupSnapshot, StateStore, TaskGroupController};

/// Completions buffered per subscriber before it starts lagging.
const COMPLETION_CAPACITY: usize = 256;

/// Errors creating a controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The initial pool could not be created
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Not called from within a tokio runtime
    #[error("No tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Point-in-time view of the whole controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSnapshot {
    /// Group A
    pub a: GroupSnapshot,
    /// Group B
    pub b: GroupSnapshot,
    /// Aggregate "work in progress"
    pub work_in_progress: bool,
    /// Active pool size
    pub pool_size: usize,
}

/// Two task groups sharing one resizable worker pool.
///
/// Group A runs the sequence-aggregate workload, group B the comparison
/// sort.
pub struct Controller {
    pool: Arc<PoolHandle>,
    store: Arc<StateStore>,
    group_a: TaskGroupController,
    group_b: TaskGroupController,
    completions: broadcast::Sender<Completion>,
}

impl Controller {
    /// Create a controller on the current tokio runtime.
    pub fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        Self::with_runtime(config, Handle::try_current()?)
    }

    /// Create a controller whose completion handlers run on `runtime`.
    pub fn with_runtime(config: ControllerConfig, runtime: Handle) -> Result<Self, ControllerError> {
        config.validate()?;

        let size = NonZeroUsize::new(config.initial_pool_size).unwrap_or(NonZeroUsize::MIN);
        let pool = Arc::new(PoolHandle::new(size, config.thread_name_prefix.clone())?);
        let store = Arc::new(StateStore::new());
        let (completions, _) = broadcast::channel(COMPLETION_CAPACITY);

        let group_a = TaskGroupController::new(
            GroupId::A,
            Arc::new(FibonacciAggregate::new(config.sequence_scale)),
            Arc::clone(&pool),
            Arc::clone(&store),
            completions.clone(),
            runtime.clone(),
        );
        let group_b = TaskGroupController::new(
            GroupId::B,
            Arc::new(BubbleSortLast::new(config.sort_scale)),
            Arc::clone(&pool),
            Arc::clone(&store),
            completions.clone(),
            runtime,
        );

        info!("Controller started with {} worker(s)", size);

        Ok(Self {
            pool,
            store,
            group_a,
            group_b,
            completions,
        })
    }

    /// The controller for `group`.
    pub fn group(&self, group: GroupId) -> &TaskGroupController {
        match group {
            GroupId::A => &self.group_a,
            GroupId::B => &self.group_b,
        }
    }

    /// Parse `text` as an integer magnitude and submit it to `group`.
    ///
    /// Text that is not an integer is silently ignored.
    pub fn submit_text(&self, group: GroupId, text: &str) -> Option<SubmissionId> {
        match text.parse::<i32>() {
            Ok(magnitude) => Some(self.group(group).submit(magnitude)),
            Err(_) => {
                debug!(group = group.tag(), "Ignoring non-integer input {:?}", text);
                None
            }
        }
    }

    /// Submit text input to group A.
    pub fn submit_a(&self, text: &str) -> Option<SubmissionId> {
        self.submit_text(GroupId::A, text)
    }

    /// Submit text input to group B.
    pub fn submit_b(&self, text: &str) -> Option<SubmissionId> {
        self.submit_text(GroupId::B, text)
    }

    /// Resize the shared pool. 0 (or less) means 1 worker.
    ///
    /// Work already dispatched keeps running on the pool it was sent to.
    pub fn set_pool_size(&self, value: i32) {
        let requested = if value == 0 { 1 } else { i64::from(value) };
        if let Err(e) = self.pool.resize(requested) {
            error!(
                "Failed to resize worker pool to {}: {}; keeping {} worker(s)",
                normalize_size(requested),
                e,
                self.pool.size()
            );
        }
    }

    /// Cancel everything in flight in group A.
    pub fn cancel_a(&self) {
        self.group_a.cancel_all();
    }

    /// Cancel everything in flight in group B.
    pub fn cancel_b(&self) {
        self.group_b.cancel_all();
    }

    /// Subscribe to the aggregate "work in progress" flag.
    pub fn work_in_progress(&self) -> watch::Receiver<bool> {
        self.store.subscribe()
    }

    /// Current aggregate "work in progress" value.
    pub fn is_work_in_progress(&self) -> bool {
        self.store.aggregate()
    }

    /// Subscribe to one group's running flag.
    pub fn group_running(&self, group: GroupId) -> watch::Receiver<bool> {
        self.store.subscribe_group(group)
    }

    /// Subscribe to completions of both groups.
    pub fn completions(&self) -> broadcast::Receiver<Completion> {
        self.completions.subscribe()
    }

    /// Number of aggregate publications so far.
    pub fn publications(&self) -> u64 {
        self.store.publications()
    }

    /// Worker threads alive across the active and retired pools.
    pub fn live_workers(&self) -> usize {
        self.pool.live_workers()
    }

    /// Snapshot of both groups, the aggregate and the pool size.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            a: self.group_a.snapshot(),
            b: self.group_b.snapshot(),
            work_in_progress: self.store.aggregate(),
            pool_size: self.pool.size().get(),
        }
    }

    /// Wait until neither group has work in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.work_in_progress();
        // The store outlives `rx`, so the channel cannot close here
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}
