//! Generation-tagged cancellation scopes.

use tokio_util::sync::CancellationToken;

use crate::WorkloadError;

/// A revocable token shared by every submission launched under it.
///
/// A group holds exactly one live scope. Cancelling the group revokes the
/// live scope and installs its successor (`generation + 1`), so submissions
/// made afterwards are never pre-cancelled. Workloads poll the scope they
/// captured at submission time at their safepoints.
#[derive(Debug, Clone)]
pub struct CancelScope {
    generation: u64,
    token: CancellationToken,
}

impl CancelScope {
    /// Create the first scope of a group.
    pub fn new() -> Self {
        Self::with_generation(0)
    }

    fn with_generation(generation: u64) -> Self {
        Self {
            generation,
            token: CancellationToken::new(),
        }
    }

    /// Generation of this scope.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this scope has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Safepoint check for workloads.
    pub fn check(&self) -> Result<(), WorkloadError> {
        if self.is_revoked() {
            Err(WorkloadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the scope is revoked.
    pub async fn revoked(&self) {
        self.token.cancelled().await
    }

    /// A scope revoked together with this one that can also be revoked on
    /// its own without affecting this one.
    pub fn child(&self) -> Self {
        Self {
            generation: self.generation,
            token: self.token.child_token(),
        }
    }

    /// Revoke this scope. Idempotent.
    pub fn revoke(&self) {
        self.token.cancel();
    }

    /// Revoke this scope and return the fresh one that replaces it.
    pub fn renew(&self) -> Self {
        self.revoke();
        Self::with_generation(self.generation + 1)
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_renew_revokes_old_scope_only() {
        let first = CancelScope::new();
        let captured = first.clone();

        let second = first.renew();

        assert!(captured.is_revoked());
        assert_eq!(captured.check(), Err(WorkloadError::Cancelled));
        assert!(!second.is_revoked());
        assert_eq!(second.generation(), 1);
        assert!(second.check().is_ok());
    }

    #[test]
    fn test_child_scope() {
        let parent = CancelScope::new();
        let child = parent.child();
        child.revoke();
        assert!(!parent.is_revoked());

        let other = parent.child();
        parent.revoke();
        assert!(other.is_revoked());
        assert_eq!(other.generation(), parent.generation());
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let scope = CancelScope::new();
        scope.revoke();
        scope.revoke();
        assert!(scope.is_revoked());
        assert_eq!(scope.generation(), 0);
    }

    #[tokio::test]
    async fn test_revoked_future_resolves() {
        let scope = CancelScope::new();
        let waiter = scope.clone();
        let handle = tokio::spawn(async move { waiter.revoked().await });

        scope.revoke();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("revocation not observed")
            .unwrap();
    }
}
