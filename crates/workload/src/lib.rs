//! Workload generators - CPU-bound computations of tunable cost.
//!
//! Both generators draw random inputs, so only the shape of the work is
//! deterministic. They poll the [`CancelScope`] they run under at their
//! safepoints and stop with [`WorkloadError::Cancelled`] once it is revoked.

#![warn(missing_docs)]

pub mod fibonacci;
pub mod bubble;

pub use fibonacci::{FibonacciAggregate, fibonacci};
pub use bubble::{BubbleSortLast, bubble_sort};

use tandem_core::{CancelScope, WorkloadError};

/// A blocking computation parameterized by an integer magnitude.
pub trait Workload: Send + Sync {
    /// Get workload name.
    fn name(&self) -> &str;

    /// Run the computation to completion on the calling thread.
    fn run(&self, magnitude: i32, scope: &CancelScope) -> Result<i64, WorkloadError>;
}

/// Number of input values for `magnitude * scale`.
pub(crate) fn input_len(magnitude: i32, scale: i32) -> Result<usize, WorkloadError> {
    let len = magnitude
        .checked_mul(scale)
        .ok_or(WorkloadError::Overflow(magnitude))?;
    usize::try_from(len).map_err(|_| WorkloadError::NegativeMagnitude(magnitude))
}

/// Allocate room for `len` values without aborting on exhaustion.
pub(crate) fn reserve<T>(len: usize) -> Result<Vec<T>, WorkloadError> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| WorkloadError::ResourceExhausted { len })?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_len() {
        assert_eq!(input_len(3, 10_000), Ok(30_000));
        assert_eq!(input_len(0, 1_000), Ok(0));
        assert_eq!(input_len(-1, 1_000), Err(WorkloadError::NegativeMagnitude(-1)));
        assert_eq!(input_len(i32::MAX, 2), Err(WorkloadError::Overflow(i32::MAX)));
    }
}
