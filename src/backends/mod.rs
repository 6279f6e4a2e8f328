//! Object Store Backends
//!
//! Provides adapters for the stores buckets can be provisioned in:
//! - S3: AWS S3 and S3-compatible endpoints
//! - Memory: process-local store for tests and dry runs

pub mod memory;
pub mod s3;

pub use memory::*;
pub use s3::*;

use crate::domain::ports::ObjectStoreRef;
use crate::error::{Error, Result};
use std::str::FromStr;
use std::sync::Arc;

/// Kind of object store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    S3,
    Memory,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s3" | "aws" => Ok(BackendKind::S3),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(Error::Configuration(format!(
                "Unknown object store backend: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Combined backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub s3: S3Config,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::S3,
            s3: S3Config::default(),
        }
    }
}

/// Factory for creating object store adapters
pub struct BackendFactory;

impl BackendFactory {
    /// Create the backend selected by the configuration
    pub async fn create(config: BackendConfig) -> ObjectStoreRef {
        match config.kind {
            BackendKind::S3 => Arc::new(S3ObjectStore::new(config.s3).await),
            BackendKind::Memory => Arc::new(MemoryObjectStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("S3".parse::<BackendKind>().unwrap(), BackendKind::S3);
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("rustfs".parse::<BackendKind>().is_err());
    }

    #[tokio::test]
    async fn test_factory_memory() {
        let config = BackendConfig {
            kind: BackendKind::Memory,
            ..Default::default()
        };
        let backend = BackendFactory::create(config).await;
        assert_eq!(backend.backend_name(), "memory");
        assert!(backend.health_check().await.unwrap());
    }
}
