//! Sequence-aggregate workload.

use rand::Rng;
use tandem_core::{CancelScope, WorkloadError};
use tracing::debug;

use crate::{input_len, reserve, Workload};

/// Smallest random Fibonacci index (inclusive).
const MIN_INDEX: u32 = 1;
/// Largest random Fibonacci index (exclusive).
const MAX_INDEX: u32 = 10;

/// The `n`-th Fibonacci term, 1-indexed over `1, 1, 2, 3, 5, ...`.
///
/// `n = 0` yields 1, like `n = 1`.
pub fn fibonacci(n: u32) -> i64 {
    let (mut prev, mut current) = (0i64, 1i64);
    for _ in 1..n {
        (prev, current) = (current, prev + current);
    }
    current
}

/// Draws `magnitude * scale` indices in `[1, 10)`, maps each to its
/// Fibonacci term, sorts the terms and returns their sum.
#[derive(Debug, Clone)]
pub struct FibonacciAggregate {
    scale: i32,
}

impl FibonacciAggregate {
    /// Create the workload with the given input length multiplier.
    pub fn new(scale: i32) -> Self {
        Self { scale }
    }
}

impl Default for FibonacciAggregate {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Workload for FibonacciAggregate {
    fn name(&self) -> &str {
        "sequence-aggregate"
    }

    fn run(&self, magnitude: i32, scope: &CancelScope) -> Result<i64, WorkloadError> {
        let len = input_len(magnitude, self.scale)?;
        debug!(len, "sequence-aggregate input");

        let mut rng = rand::thread_rng();
        let mut terms: Vec<i64> = reserve(len)?;
        for _ in 0..len {
            scope.check()?;
            terms.push(fibonacci(rng.gen_range(MIN_INDEX..MAX_INDEX)));
        }

        scope.check()?;
        terms.sort_unstable();
        Ok(terms.iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_terms() {
        let terms: Vec<i64> = (1..=9).map(fibonacci).collect();
        assert_eq!(terms, vec![1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_aggregate_bounds() {
        let workload = FibonacciAggregate::default();
        let sum = workload.run(3, &CancelScope::new()).unwrap();

        // 30000 terms, each between fib(1) = 1 and fib(9) = 34
        assert!(sum >= 30_000);
        assert!(sum <= 30_000 * 34);
    }

    #[test]
    fn test_zero_magnitude_is_empty_sum() {
        let workload = FibonacciAggregate::default();
        assert_eq!(workload.run(0, &CancelScope::new()), Ok(0));
    }

    #[test]
    fn test_negative_magnitude_fails() {
        let workload = FibonacciAggregate::default();
        assert_eq!(
            workload.run(-2, &CancelScope::new()),
            Err(WorkloadError::NegativeMagnitude(-2))
        );
    }

    #[test]
    fn test_revoked_scope_stops_at_first_safepoint() {
        let workload = FibonacciAggregate::default();
        let scope = CancelScope::new();
        scope.revoke();

        assert_eq!(workload.run(10, &scope), Err(WorkloadError::Cancelled));
    }
}
