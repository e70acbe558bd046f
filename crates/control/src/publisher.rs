//! Aggregate "work in progress" publisher.

use tokio::sync::watch;

/// Publishes whether any group has work in flight.
///
/// Every call to [`publish`](Self::publish) notifies subscribers, including
/// when the combined value did not change.
#[derive(Debug)]
pub struct AggregatePublisher {
    sender: watch::Sender<bool>,
    publications: u64,
}

impl AggregatePublisher {
    /// Create a publisher whose initial value is `false`.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender,
            publications: 0,
        }
    }

    /// Recompute from both groups' running flags and republish.
    pub fn publish(&mut self, a_running: bool, b_running: bool) -> bool {
        let combined = a_running || b_running;
        self.sender.send_replace(combined);
        self.publications += 1;
        combined
    }

    /// Last published value.
    pub fn current(&self) -> bool {
        *self.sender.borrow()
    }

    /// Subscribe to publications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Number of publications so far.
    pub fn publications(&self) -> u64 {
        self.publications
    }
}

impl Default for AggregatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_truth_table() {
        let mut publisher = AggregatePublisher::new();
        assert!(!publisher.current());

        assert!(!publisher.publish(false, false));
        assert!(publisher.publish(true, false));
        assert!(publisher.publish(false, true));
        assert!(publisher.publish(true, true));
        assert_eq!(publisher.publications(), 4);
    }

    #[test]
    fn test_unchanged_value_still_notifies() {
        let mut publisher = AggregatePublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish(true, false);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        publisher.publish(true, true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
    }
}
