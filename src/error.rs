//! Error types for the S3 bucket provisioner
//!
//! Provides structured error types for name rendering, bucket provisioning,
//! claim handling and the Kubernetes controller.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Name Template Errors
    // =========================================================================
    #[error("Invalid name template {template:?} at byte {position}: {reason}")]
    TemplateSyntax {
        template: String,
        position: usize,
        reason: String,
    },

    #[error("Name template execution failed for field {field}: {reason}")]
    TemplateExecution { field: String, reason: String },

    #[error("Invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: String },

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Provisioning failed for bucket {bucket} during {operation}: {reason}")]
    Provisioning {
        bucket: String,
        operation: String,
        reason: String,
    },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Invalid claim {claim}: {reason}")]
    InvalidClaim { claim: String, reason: String },
}

impl Error {
    /// Build a provisioning error for a failed store operation
    pub fn provisioning(
        bucket: impl Into<String>,
        operation: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Error::Provisioning {
            bucket: bucket.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Build the conflict signal reported when a bucket already exists
    pub fn bucket_exists(name: impl Into<String>) -> Self {
        Error::ResourceExists {
            kind: "Bucket".into(),
            name: name.into(),
        }
    }
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Provisioning { .. } | Error::Kube(_) => ErrorAction::RequeueWithBackoff,

            // Only a change to the claim or the template fixes these
            Error::TemplateExecution { .. }
            | Error::InvalidBucketName { .. }
            | Error::InvalidClaim { .. } => {
                ErrorAction::RequeueAfter(Duration::from_secs(300))
            }

            // Startup errors - don't retry automatically
            Error::Configuration(_) | Error::TemplateSyntax { .. } => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this is the store's "bucket already exists" conflict
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::ResourceExists { kind, .. } if kind == "Bucket")
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;
