//! Task group controller - submit and cancel-all for one workload kind.

use std::sync::Arc;

use tandem_core::{Completion, GroupId, Outcome, Submission, SubmissionId, WorkloadError};
use tandem_pool::PoolHandle;
use tandem_workload::Workload;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{GroupSnapshot, StateStore};

/// Decrements the group's in-flight count when dropped, whichever way the
/// submission ends.
struct InFlightGuard {
    store: Arc<StateStore>,
    group: GroupId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.store.finish(self.group);
        debug!(group = self.group.tag(), "counter value: {}", remaining);
    }
}

/// Controls one task group.
pub struct TaskGroupController {
    group: GroupId,
    workload: Arc<dyn Workload>,
    pool: Arc<PoolHandle>,
    store: Arc<StateStore>,
    completions: broadcast::Sender<Completion>,
    runtime: Handle,
}

impl TaskGroupController {
    /// Create a controller for `group`.
    pub fn new(
        group: GroupId,
        workload: Arc<dyn Workload>,
        pool: Arc<PoolHandle>,
        store: Arc<StateStore>,
        completions: broadcast::Sender<Completion>,
        runtime: Handle,
    ) -> Self {
        Self {
            group,
            workload,
            pool,
            store,
            completions,
            runtime,
        }
    }

    /// Group this controller owns.
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Name of the workload this group runs.
    pub fn workload_name(&self) -> &str {
        self.workload.name()
    }

    /// Submit `magnitude` to the pool. Returns immediately.
    ///
    /// The completion is logged and broadcast once the computation succeeds,
    /// fails or is cancelled; errors never reach the caller.
    pub fn submit(&self, magnitude: i32) -> SubmissionId {
        let scope = self.store.begin(self.group);
        let guard = InFlightGuard {
            store: Arc::clone(&self.store),
            group: self.group,
        };

        let submission = Submission::new(self.group, magnitude, scope.generation());
        let id = submission.id;
        info!(
            group = self.group.tag(),
            "Started({}) at {}",
            magnitude,
            submission.started_at.timestamp_millis()
        );

        let workload = Arc::clone(&self.workload);
        let dispatched = self
            .pool
            .submit(&scope, move |scope| workload.run(magnitude, scope));
        let completions = self.completions.clone();

        self.runtime.spawn(async move {
            let result = match dispatched {
                Ok(handle) => handle.join().await,
                Err(e) => {
                    error!(group = submission.group.tag(), "Failed to dispatch({}): {}", magnitude, e);
                    Err(WorkloadError::PoolClosed)
                }
            };

            let outcome = classify(&submission, result);
            drop(guard);

            // No subscribers is fine
            let _ = completions.send(Completion { submission, outcome });
        });

        id
    }

    /// Cancel every submission in flight and start a fresh scope.
    ///
    /// The other group is untouched.
    pub fn cancel_all(&self) {
        let (revoked, in_flight) = self.store.renew_scope(self.group);
        info!(
            group = self.group.tag(),
            "Cancelling {} in-flight submission(s) of scope generation {}",
            in_flight,
            revoked
        );
    }

    /// Snapshot of this group.
    pub fn snapshot(&self) -> GroupSnapshot {
        self.store.snapshot(self.group)
    }
}

fn classify(submission: &Submission, result: Result<i64, WorkloadError>) -> Outcome {
    let elapsed = submission.elapsed();
    let tag = submission.group.tag();
    let magnitude = submission.magnitude;

    match result {
        Ok(result) => {
            info!(
                group = tag,
                "Finished({}) in time: {} with result: {}",
                magnitude,
                elapsed.as_millis(),
                result
            );
            Outcome::Success { result, elapsed }
        }
        Err(e) if e.is_cancelled() => {
            info!(group = tag, "Cancelled({}) after {}", magnitude, elapsed.as_millis());
            Outcome::Cancelled { elapsed }
        }
        Err(e) => {
            warn!(
                group = tag,
                "Error({}), caught error during computation after {}: {}",
                magnitude,
                elapsed.as_millis(),
                e
            );
            Outcome::Failed {
                error: e.to_string(),
                elapsed,
            }
        }
    }
}
