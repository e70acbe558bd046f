//! Comparison-sort workload.

use rand::Rng;
use tandem_core::{CancelScope, WorkloadError};
use tracing::debug;

use crate::{input_len, reserve, Workload};

/// Adjacent-swap bubble sort, ascending, in place.
///
/// Checks `scope` once per outer pass.
pub fn bubble_sort(values: &mut [i32], scope: &CancelScope) -> Result<(), WorkloadError> {
    let n = values.len();
    for i in 0..n.saturating_sub(1) {
        scope.check()?;
        for j in 0..n - i - 1 {
            if values[j] > values[j + 1] {
                values.swap(j, j + 1);
            }
        }
    }
    Ok(())
}

/// Draws `magnitude * scale` values in `[1, magnitude * scale)`, bubble
/// sorts them and returns the last (largest) element.
#[derive(Debug, Clone)]
pub struct BubbleSortLast {
    scale: i32,
}

impl BubbleSortLast {
    /// Create the workload with the given input length multiplier.
    pub fn new(scale: i32) -> Self {
        Self { scale }
    }
}

impl Default for BubbleSortLast {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl Workload for BubbleSortLast {
    fn name(&self) -> &str {
        "comparison-sort"
    }

    fn run(&self, magnitude: i32, scope: &CancelScope) -> Result<i64, WorkloadError> {
        let len = input_len(magnitude, self.scale)?;
        debug!(len, "comparison-sort input");

        let mut values: Vec<i32> = reserve(len)?;
        if len > 0 {
            // len came from an i32 product, so it is also the exclusive bound
            let high = len as i32;
            if high <= 1 {
                return Err(WorkloadError::EmptyRange { low: 1, high: i64::from(high) });
            }
            let mut rng = rand::thread_rng();
            values.extend((0..len).map(|_| rng.gen_range(1..high)));
        }

        bubble_sort(&mut values, scope)?;

        values
            .last()
            .map(|&last| i64::from(last))
            .ok_or(WorkloadError::EmptyInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_sort_orders_ascending() {
        let mut values = vec![5, 1, 4, 2, 8, 2, 0, -3];
        bubble_sort(&mut values, &CancelScope::new()).unwrap();
        assert_eq!(values, vec![-3, 0, 1, 2, 2, 4, 5, 8]);
    }

    #[test]
    fn test_bubble_sort_trivial_inputs() {
        let scope = CancelScope::new();
        let mut empty: Vec<i32> = vec![];
        bubble_sort(&mut empty, &scope).unwrap();

        let mut single = vec![7];
        bubble_sort(&mut single, &scope).unwrap();
        assert_eq!(single, vec![7]);
    }

    #[test]
    fn test_sort_returns_value_in_range() {
        let workload = BubbleSortLast::default();
        let last = workload.run(2, &CancelScope::new()).unwrap();
        assert!((1..2_000).contains(&last));
    }

    #[test]
    fn test_zero_magnitude_has_no_last_element() {
        let workload = BubbleSortLast::default();
        assert_eq!(workload.run(0, &CancelScope::new()), Err(WorkloadError::EmptyInput));
    }

    #[test]
    fn test_single_value_range_is_empty() {
        let workload = BubbleSortLast::new(1);
        assert_eq!(
            workload.run(1, &CancelScope::new()),
            Err(WorkloadError::EmptyRange { low: 1, high: 1 })
        );
    }

    #[test]
    fn test_revoked_scope_cancels_sort() {
        let workload = BubbleSortLast::default();
        let scope = CancelScope::new();
        scope.revoke();

        assert_eq!(workload.run(5, &scope), Err(WorkloadError::Cancelled));
    }

    #[test]
    fn test_revoked_scope_ignored_for_single_pass_input() {
        let mut values = vec![1];
        let scope = CancelScope::new();
        scope.revoke();

        // No outer pass, no safepoint
        assert!(bubble_sort(&mut values, &scope).is_ok());
    }
}
