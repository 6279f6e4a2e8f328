//! Bucket Store
//!
//! Idempotent bucket creation and versioning on top of an [`ObjectStore`].
//! No existence state is cached here; every call goes to the store.

use crate::domain::ports::{ObjectStore, ObjectStoreRef};
use crate::error::Result;
use tracing::{debug, info};

/// Outcome of [`BucketStore::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The bucket was created by this call
    Created,
    /// The store reported the bucket as already existing
    AlreadyExists,
}

impl EnsureOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsureOutcome::Created => "created",
            EnsureOutcome::AlreadyExists => "existing",
        }
    }
}

impl std::fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Idempotent bucket operations
#[derive(Clone)]
pub struct BucketStore {
    backend: ObjectStoreRef,
}

impl BucketStore {
    /// Create a bucket store over a backend
    pub fn new(backend: ObjectStoreRef) -> Self {
        Self { backend }
    }

    /// Backend this store talks to
    pub fn backend(&self) -> &dyn ObjectStore {
        self.backend.as_ref()
    }

    /// Make sure a bucket named `name` exists in `region`
    ///
    /// The store's already-exists conflict counts as success. Any other
    /// failure is returned unchanged and nothing is retried here.
    pub async fn ensure(&self, name: &str, region: &str) -> Result<EnsureOutcome> {
        match self.backend.create_bucket(name, region).await {
            Ok(()) => {
                info!(bucket = %name, region = %region, "Created bucket");
                Ok(EnsureOutcome::Created)
            }
            Err(e) if e.is_already_exists() => {
                debug!(bucket = %name, "Bucket already exists");
                Ok(EnsureOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    /// Turn on object versioning for `name`
    ///
    /// Safe to repeat; the store treats it as a configuration set.
    pub async fn enable_versioning(&self, name: &str) -> Result<()> {
        self.backend.set_versioning(name, true).await?;
        debug!(bucket = %name, "Versioning enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryObjectStore;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn store() -> (Arc<MemoryObjectStore>, BucketStore) {
        let memory = Arc::new(MemoryObjectStore::new());
        (memory.clone(), BucketStore::new(memory))
    }

    #[tokio::test]
    async fn test_ensure_twice_is_success() {
        let (memory, store) = store();

        let first = store.ensure("team-a-pv-123", "us-east-1").await.unwrap();
        let second = store.ensure("team-a-pv-123", "us-east-1").await.unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::AlreadyExists);
        assert_eq!(memory.bucket_count().await, 1);
        assert_eq!(memory.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_ensure_propagates_other_failures() {
        let (memory, store) = store();
        memory.fail_create_with("AccessDenied").await;

        let result = store.ensure("team-a-pv-123", "us-east-1").await;

        assert_matches!(result, Err(Error::Provisioning { ref operation, .. }) if operation == "create_bucket");
        assert_eq!(memory.bucket_count().await, 0);
    }

    #[tokio::test]
    async fn test_enable_versioning_is_repeatable() {
        let (memory, store) = store();
        store.ensure("versioned", "eu-west-1").await.unwrap();

        store.enable_versioning("versioned").await.unwrap();
        store.enable_versioning("versioned").await.unwrap();

        let bucket = memory.bucket("versioned").await.unwrap();
        assert!(bucket.versioning_enabled);
        assert_eq!(memory.versioning_calls(), 2);
    }

    #[tokio::test]
    async fn test_enable_versioning_failure_leaves_bucket() {
        let (memory, store) = store();
        store.ensure("unversioned", "us-east-1").await.unwrap();
        memory.fail_versioning_with("SlowDown").await;

        assert!(store.enable_versioning("unversioned").await.is_err());

        let bucket = memory.bucket("unversioned").await.unwrap();
        assert!(!bucket.versioning_enabled);
    }
}
