//! Submissions - one unit of work handed to a task group.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::{GroupId, SubmissionId, Time};

/// A single piece of work submitted to a task group.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    /// Unique identifier
    pub id: SubmissionId,

    /// Owning group
    pub group: GroupId,

    /// Input magnitude
    pub magnitude: i32,

    /// Generation of the cancel scope captured at submission time
    pub generation: u64,

    /// Wall-clock start
    pub started_at: Time,

    #[serde(skip)]
    started: Instant,
}

impl Submission {
    /// Create a submission starting now.
    pub fn new(group: GroupId, magnitude: i32, generation: u64) -> Self {
        Self {
            id: SubmissionId::new(),
            group,
            magnitude,
            generation,
            started_at: chrono::Utc::now(),
            started: Instant::now(),
        }
    }

    /// Time elapsed since the submission started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// How a submission terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The computation returned a result
    Success { result: i64, elapsed: Duration },
    /// The submission's scope was revoked first
    Cancelled { elapsed: Duration },
    /// The computation failed
    Failed { error: String, elapsed: Duration },
}

impl Outcome {
    /// Time from submission to termination.
    pub fn elapsed(&self) -> Duration {
        match self {
            Outcome::Success { elapsed, .. }
            | Outcome::Cancelled { elapsed }
            | Outcome::Failed { elapsed, .. } => *elapsed,
        }
    }

    /// Whether the submission was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }

    /// Result value, if the submission succeeded.
    pub fn result(&self) -> Option<i64> {
        match self {
            Outcome::Success { result, .. } => Some(*result),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success { result, elapsed } => {
                write!(f, "finished in {}ms with result {}", elapsed.as_millis(), result)
            }
            Outcome::Cancelled { elapsed } => {
                write!(f, "cancelled after {}ms", elapsed.as_millis())
            }
            Outcome::Failed { error, elapsed } => {
                write!(f, "failed after {}ms: {}", elapsed.as_millis(), error)
            }
        }
    }
}

/// A finished submission together with its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    /// The submission
    pub submission: Submission,

    /// How it terminated
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = Outcome::Success { result: 42, elapsed: Duration::from_millis(5) };
        assert_eq!(ok.result(), Some(42));
        assert!(!ok.is_cancelled());

        let cancelled = Outcome::Cancelled { elapsed: Duration::from_millis(7) };
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.result(), None);
        assert_eq!(cancelled.elapsed(), Duration::from_millis(7));
    }

    #[test]
    fn test_completion_serializes_with_status_tag() {
        let completion = Completion {
            submission: Submission::new(GroupId::B, 2, 0),
            outcome: Outcome::Failed { error: "boom".to_string(), elapsed: Duration::ZERO },
        };

        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["submission"]["group"], "B");
        assert_eq!(json["submission"]["magnitude"], 2);
    }
}
