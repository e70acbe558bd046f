//! Error types.

/// Errors a workload computation can terminate with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError {
    /// The submission's scope was revoked
    #[error("computation cancelled")]
    Cancelled,

    /// Magnitude produced a negative input size
    #[error("negative input size for magnitude {0}")]
    NegativeMagnitude(i32),

    /// Input size does not fit the integer range
    #[error("input size overflows for magnitude {0}")]
    Overflow(i32),

    /// Random range with no values in it
    #[error("random range [{low}, {high}) is empty")]
    EmptyRange {
        /// Inclusive lower bound
        low: i64,
        /// Exclusive upper bound
        high: i64,
    },

    /// The input array could not be allocated
    #[error("cannot allocate {len} input values")]
    ResourceExhausted {
        /// Requested input length
        len: usize,
    },

    /// Last element requested from an empty array
    #[error("array is empty")]
    EmptyInput,

    /// The worker thread panicked while computing
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The pool dropped the job before it produced a result
    #[error("worker pool closed before the job completed")]
    PoolClosed,
}

impl WorkloadError {
    /// Whether this error means the computation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkloadError::Cancelled)
    }
}

/// Errors loading a controller configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
