//! Mutual exclusion for units of work.
//!
//! Every job that must not run twice for the same subject (replicating a
//! bundle, ingesting a store's catalog) takes a claim first. A second
//! attempt while the claim is held gets `None` and skips the work.
//!
//! Two registries are provided:
//! - [`PgClaimRegistry`] - expiring leases in the `claims` table, shared by
//!   every worker instance and surviving restarts
//! - [`LocalClaimRegistry`] - a process-local set for tests and
//!   single-instance development

mod postgres;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use bundle_relay_core::{BundleId, StoreId};
use thiserror::Error;
use uuid::Uuid;

pub use postgres::PgClaimRegistry;

/// Errors that can occur while taking or releasing a claim.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Database error from sqlx.
    #[error("claim storage error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Subject of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimKey {
    /// Replication of one bundle.
    Bundle(BundleId),
    /// Catalog ingestion of one store.
    StoreCatalog(StoreId),
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle(id) => write!(f, "bundle:{id}"),
            Self::StoreCatalog(id) => write!(f, "store-catalog:{id}"),
        }
    }
}

/// A held claim. Hand it back to [`ClaimRegistry::release`] when done.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a claim must be released"]
pub struct Claim {
    key: ClaimKey,
    holder: Uuid,
}

impl Claim {
    fn new(key: ClaimKey) -> Self {
        Self {
            key,
            holder: Uuid::new_v4(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> ClaimKey {
        self.key
    }

    /// Token identifying this acquisition.
    #[must_use]
    pub const fn holder(&self) -> Uuid {
        self.holder
    }
}

/// Atomic test-and-set over [`ClaimKey`]s.
pub trait ClaimRegistry: Send + Sync {
    /// Take the claim, or `None` if someone else holds it.
    fn try_acquire(
        &self,
        key: ClaimKey,
    ) -> impl Future<Output = Result<Option<Claim>, ClaimError>> + Send;

    /// Free the claim. Releasing a claim that has since been taken over by
    /// another holder is a no-op.
    fn release(&self, claim: Claim) -> impl Future<Output = Result<(), ClaimError>> + Send;

    /// Extend the claim for long-running work. Returns `false` when the
    /// claim is no longer held by this holder.
    fn renew(&self, claim: &Claim) -> impl Future<Output = Result<bool, ClaimError>> + Send;
}

impl<T: ClaimRegistry> ClaimRegistry for Arc<T> {
    fn try_acquire(
        &self,
        key: ClaimKey,
    ) -> impl Future<Output = Result<Option<Claim>, ClaimError>> + Send {
        (**self).try_acquire(key)
    }

    fn release(&self, claim: Claim) -> impl Future<Output = Result<(), ClaimError>> + Send {
        (**self).release(claim)
    }

    fn renew(&self, claim: &Claim) -> impl Future<Output = Result<bool, ClaimError>> + Send {
        (**self).renew(claim)
    }
}

/// Release a claim, logging instead of failing.
///
/// Used on the way out of a job, where the job's own result matters more
/// than the release; an unreleased durable claim expires with its lease.
pub async fn release_quietly<K: ClaimRegistry>(registry: &K, claim: Claim) {
    let key = claim.key();
    if let Err(e) = registry.release(claim).await {
        tracing::warn!(claim = %key, error = %e, "Failed to release claim");
    }
}

/// Process-local claims.
#[derive(Debug, Default)]
pub struct LocalClaimRegistry {
    held: Mutex<HashMap<ClaimKey, Uuid>>,
}

impl LocalClaimRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held.
    #[must_use]
    pub fn is_held(&self, key: ClaimKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }
}

impl ClaimRegistry for LocalClaimRegistry {
    async fn try_acquire(&self, key: ClaimKey) -> Result<Option<Claim>, ClaimError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.contains_key(&key) {
            return Ok(None);
        }
        let claim = Claim::new(key);
        held.insert(key, claim.holder);
        Ok(Some(claim))
    }

    async fn release(&self, claim: Claim) -> Result<(), ClaimError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.get(&claim.key) == Some(&claim.holder) {
            held.remove(&claim.key);
        }
        Ok(())
    }

    async fn renew(&self, claim: &Claim) -> Result<bool, ClaimError> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(held.get(&claim.key) == Some(&claim.holder))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_key_display() {
        let id = BundleId::new(Uuid::nil());
        assert_eq!(
            ClaimKey::Bundle(id).to_string(),
            "bundle:00000000-0000-0000-0000-000000000000"
        );
        let store = StoreId::new(Uuid::nil());
        assert!(ClaimKey::StoreCatalog(store)
            .to_string()
            .starts_with("store-catalog:"));
    }

    #[tokio::test]
    async fn test_second_acquire_is_refused() {
        let registry = LocalClaimRegistry::new();
        let key = ClaimKey::Bundle(BundleId::generate());

        let first = registry.try_acquire(key).await.unwrap();
        assert!(first.is_some());
        assert!(registry.try_acquire(key).await.unwrap().is_none());
        assert!(registry.is_held(key));

        registry.release(first.unwrap()).await.unwrap();
        assert!(!registry.is_held(key));
        assert!(registry.try_acquire(key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let registry = LocalClaimRegistry::new();
        let a = registry
            .try_acquire(ClaimKey::Bundle(BundleId::generate()))
            .await
            .unwrap();
        let b = registry
            .try_acquire(ClaimKey::Bundle(BundleId::generate()))
            .await
            .unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn test_stale_release_does_not_free_new_holder() {
        let registry = LocalClaimRegistry::new();
        let key = ClaimKey::StoreCatalog(StoreId::generate());

        let first = registry.try_acquire(key).await.unwrap().unwrap();
        let stale = first.clone();
        registry.release(first).await.unwrap();
        let _second = registry.try_acquire(key).await.unwrap().unwrap();

        registry.release(stale).await.unwrap();
        assert!(registry.is_held(key));
    }

    #[tokio::test]
    async fn test_renew_only_for_current_holder() {
        let registry = LocalClaimRegistry::new();
        let key = ClaimKey::StoreCatalog(StoreId::generate());

        let first = registry.try_acquire(key).await.unwrap().unwrap();
        assert!(registry.renew(&first).await.unwrap());

        let stale = first.clone();
        registry.release(first).await.unwrap();
        assert!(!registry.renew(&stale).await.unwrap());

        let second = registry.try_acquire(key).await.unwrap().unwrap();
        assert!(!registry.renew(&stale).await.unwrap());
        assert!(registry.renew(&second).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_acquires_grant_exactly_one() {
        let registry = Arc::new(LocalClaimRegistry::new());
        let key = ClaimKey::Bundle(BundleId::generate());

        let attempts = (0..16).map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.try_acquire(key).await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;

        let granted = results
            .into_iter()
            .filter(|r| r.as_ref().unwrap().is_some())
            .count();
        assert_eq!(granted, 1);
    }
}
