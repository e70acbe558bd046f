//! Single-owner store for group counters, running flags and the aggregate.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tandem_core::{CancelScope, GroupId};
use tokio::sync::watch;

use crate::AggregatePublisher;

/// Point-in-time view of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Submissions not yet completed
    pub in_flight: usize,
    /// Whether the group currently reports work
    pub running: bool,
    /// Generation of the live cancel scope
    pub generation: u64,
}

struct GroupState {
    in_flight: usize,
    running: bool,
    scope: CancelScope,
    running_tx: watch::Sender<bool>,
}

impl GroupState {
    fn new() -> Self {
        let (running_tx, _) = watch::channel(false);
        Self {
            in_flight: 0,
            running: false,
            scope: CancelScope::new(),
            running_tx,
        }
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
        self.running_tx.send_replace(running);
    }

    fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            in_flight: self.in_flight,
            running: self.running,
            generation: self.scope.generation(),
        }
    }
}

struct Ledger {
    a: GroupState,
    b: GroupState,
    aggregate: AggregatePublisher,
}

impl Ledger {
    fn group(&mut self, group: GroupId) -> &mut GroupState {
        match group {
            GroupId::A => &mut self.a,
            GroupId::B => &mut self.b,
        }
    }

    fn republish(&mut self) {
        let (a, b) = (self.a.running, self.b.running);
        self.aggregate.publish(a, b);
    }
}

/// Owns every piece of mutable controller state.
///
/// All mutations go through one lock, so the aggregate is always derived
/// from both groups' flags as they stood at the same instant.
pub struct StateStore {
    ledger: Mutex<Ledger>,
}

impl StateStore {
    /// Create a store with both groups idle.
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                a: GroupState::new(),
                b: GroupState::new(),
                aggregate: AggregatePublisher::new(),
            }),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a new submission and return the scope it runs under.
    ///
    /// Always republishes `running = true` and the aggregate.
    pub fn begin(&self, group: GroupId) -> CancelScope {
        let mut ledger = self.ledger();
        let state = ledger.group(group);
        state.in_flight += 1;
        state.set_running(true);
        let scope = state.scope.clone();
        ledger.republish();
        scope
    }

    /// Count a finished submission and return how many remain.
    ///
    /// When none remain the group publishes `running = false` and the
    /// aggregate is recomputed.
    pub fn finish(&self, group: GroupId) -> usize {
        let mut ledger = self.ledger();
        let state = ledger.group(group);
        state.in_flight = state.in_flight.saturating_sub(1);
        let remaining = state.in_flight;
        if remaining == 0 {
            state.set_running(false);
            ledger.republish();
        }
        remaining
    }

    /// Revoke the group's live scope and install a fresh one.
    ///
    /// Returns the revoked generation and the submissions in flight at the
    /// time of revocation.
    pub fn renew_scope(&self, group: GroupId) -> (u64, usize) {
        let mut ledger = self.ledger();
        let state = ledger.group(group);
        let revoked = state.scope.generation();
        state.scope = state.scope.renew();
        (revoked, state.in_flight)
    }

    /// Snapshot of one group.
    pub fn snapshot(&self, group: GroupId) -> GroupSnapshot {
        self.ledger().group(group).snapshot()
    }

    /// Current aggregate value.
    pub fn aggregate(&self) -> bool {
        self.ledger().aggregate.current()
    }

    /// Subscribe to the aggregate "work in progress" flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ledger().aggregate.subscribe()
    }

    /// Subscribe to one group's running flag.
    pub fn subscribe_group(&self, group: GroupId) -> watch::Receiver<bool> {
        self.ledger().group(group).running_tx.subscribe()
    }

    /// Number of aggregate publications so far.
    pub fn publications(&self) -> u64 {
        self.ledger().aggregate.publications()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(store: &StateStore, group: GroupId) {
        let snapshot = store.snapshot(group);
        assert_eq!(snapshot.running, snapshot.in_flight > 0);
    }

    #[test]
    fn test_running_tracks_count() {
        let store = StateStore::new();

        store.begin(GroupId::A);
        store.begin(GroupId::A);
        assert_invariant(&store, GroupId::A);
        assert_eq!(store.snapshot(GroupId::A).in_flight, 2);

        assert_eq!(store.finish(GroupId::A), 1);
        assert_invariant(&store, GroupId::A);
        assert!(store.aggregate());

        assert_eq!(store.finish(GroupId::A), 0);
        assert_invariant(&store, GroupId::A);
        assert!(!store.aggregate());
    }

    #[test]
    fn test_count_never_negative() {
        let store = StateStore::new();
        assert_eq!(store.finish(GroupId::B), 0);
        assert_eq!(store.snapshot(GroupId::B).in_flight, 0);
        assert_invariant(&store, GroupId::B);
    }

    #[test]
    fn test_aggregate_false_only_when_both_idle() {
        let store = StateStore::new();

        store.begin(GroupId::A);
        store.begin(GroupId::B);
        store.finish(GroupId::A);
        assert!(store.aggregate());

        store.finish(GroupId::B);
        assert!(!store.aggregate());
    }

    #[test]
    fn test_republishes_on_every_source_event() {
        let store = StateStore::new();

        store.begin(GroupId::A); // 1
        store.begin(GroupId::A); // 2, value unchanged
        store.finish(GroupId::A); // count 2 -> 1, running untouched
        store.finish(GroupId::A); // 3
        assert_eq!(store.publications(), 3);
    }

    #[test]
    fn test_renew_scope_is_per_group() {
        let store = StateStore::new();
        let a_scope = store.begin(GroupId::A);
        let b_scope = store.begin(GroupId::B);

        let (revoked, in_flight) = store.renew_scope(GroupId::A);

        assert_eq!((revoked, in_flight), (0, 1));
        assert!(a_scope.is_revoked());
        assert!(!b_scope.is_revoked());
        assert_eq!(store.snapshot(GroupId::A).generation, 1);
        assert_eq!(store.snapshot(GroupId::B), GroupSnapshot { in_flight: 1, running: true, generation: 0 });

        // Fresh scope is not pre-cancelled
        assert!(!store.begin(GroupId::A).is_revoked());
    }

    #[test]
    fn test_group_subscription() {
        let store = StateStore::new();
        let mut rx = store.subscribe_group(GroupId::B);

        store.begin(GroupId::A);
        assert!(!rx.has_changed().unwrap());

        store.begin(GroupId::B);
        assert!(*rx.borrow_and_update());
        store.finish(GroupId::B);
        assert!(!*rx.borrow_and_update());
    }
}
