//! In-Memory Object Store
//!
//! Process-local stand-in for S3 with the same create-if-absent and
//! versioning semantics. Supports fault injection for exercising failure
//! paths and dry runs without cloud credentials.

use crate::domain::ports::ObjectStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

// =============================================================================
// Bucket State
// =============================================================================

/// Snapshot of a bucket held by the in-memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    pub region: String,
    pub versioning_enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default)]
struct Faults {
    create: Option<String>,
    versioning: Option<String>,
}

// =============================================================================
// Memory Object Store
// =============================================================================

/// In-memory implementation of [`ObjectStore`]
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<BTreeMap<String, BucketInfo>>,
    faults: RwLock<Faults>,
    create_calls: AtomicU64,
    versioning_calls: AtomicU64,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bucket as if it had been created out of band
    pub async fn insert_existing(&self, name: &str, region: &str) {
        self.buckets.write().await.insert(
            name.to_string(),
            BucketInfo {
                name: name.to_string(),
                region: region.to_string(),
                versioning_enabled: false,
                created_at: chrono::Utc::now(),
            },
        );
    }

    /// Make every create call fail with `reason` until cleared
    pub async fn fail_create_with(&self, reason: impl Into<String>) {
        self.faults.write().await.create = Some(reason.into());
    }

    /// Make every versioning call fail with `reason` until cleared
    pub async fn fail_versioning_with(&self, reason: impl Into<String>) {
        self.faults.write().await.versioning = Some(reason.into());
    }

    /// Remove injected faults
    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }

    /// Get bucket by name
    pub async fn bucket(&self, name: &str) -> Option<BucketInfo> {
        self.buckets.read().await.get(name).cloned()
    }

    /// Number of buckets held
    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }

    /// Number of create calls received, including failed ones
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::Relaxed)
    }

    /// Number of versioning calls received, including failed ones
    pub fn versioning_calls(&self) -> u64 {
        self.versioning_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_bucket(&self, name: &str, region: &str) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = self.faults.read().await.create.clone() {
            return Err(Error::provisioning(name, "create_bucket", reason));
        }

        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(name) {
            return Err(Error::bucket_exists(name));
        }

        buckets.insert(
            name.to_string(),
            BucketInfo {
                name: name.to_string(),
                region: region.to_string(),
                versioning_enabled: false,
                created_at: chrono::Utc::now(),
            },
        );

        info!(bucket = %name, region = %region, "Created in-memory bucket");
        Ok(())
    }

    async fn set_versioning(&self, name: &str, enabled: bool) -> Result<()> {
        self.versioning_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = self.faults.read().await.versioning.clone() {
            return Err(Error::provisioning(name, "put_bucket_versioning", reason));
        }

        let mut buckets = self.buckets.write().await;
        let bucket = buckets.get_mut(name).ok_or_else(|| Error::ResourceNotFound {
            kind: "Bucket".into(),
            name: name.into(),
        })?;
        bucket.versioning_enabled = enabled;

        debug!(bucket = %name, enabled, "Set in-memory bucket versioning");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
