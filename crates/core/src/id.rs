//! Identifiers for submissions and task groups.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a Submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(Ulid);

impl SubmissionId {
    /// Generate a new SubmissionId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// One of the two task groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
    /// Sequence-aggregate workloads
    A,
    /// Comparison-sort workloads
    B,
}

impl GroupId {
    /// Both groups, in display order.
    pub const ALL: [GroupId; 2] = [GroupId::A, GroupId::B];

    /// Log tag used for every message emitted on behalf of this group.
    pub fn tag(&self) -> &'static str {
        match self {
            GroupId::A => "Task_A",
            GroupId::B => "Task_B",
        }
    }

    /// The other group.
    pub fn other(&self) -> GroupId {
        match self {
            GroupId::A => GroupId::B,
            GroupId::B => GroupId::A,
        }
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupId::A => write!(f, "A"),
            GroupId::B => write!(f, "B"),
        }
    }
}

impl std::str::FromStr for GroupId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(GroupId::A),
            "b" => Ok(GroupId::B),
            other => Err(format!("unknown group: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_parse() {
        assert_eq!("a".parse::<GroupId>(), Ok(GroupId::A));
        assert_eq!(" B ".parse::<GroupId>(), Ok(GroupId::B));
        assert!("c".parse::<GroupId>().is_err());
    }

    #[test]
    fn test_group_other() {
        assert_eq!(GroupId::A.other(), GroupId::B);
        assert_eq!(GroupId::B.other(), GroupId::A);
        assert_eq!(GroupId::A.tag(), "Task_A");
    }

    #[test]
    fn test_submission_id_roundtrip_display() {
        let id = SubmissionId::new();
        let parsed: SubmissionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
