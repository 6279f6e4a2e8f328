//! S3 Bucket Provisioner
//!
//! A Kubernetes dynamic volume provisioner that backs every claim with a
//! versioned S3 bucket and hands it to the node as a FlexVolume mount.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     Claim Controller (kube-runtime)                   │
//! │            PersistentVolumeClaim ──▶ PersistentVolume                 │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                          Provision Workflow                           │
//! │  ┌───────────────┐   ┌────────────────────┐   ┌────────────────────┐  │
//! │  │ Name Template │──▶│    Bucket Store    │──▶│  Volume Assembler  │  │
//! │  │   (render)    │   │ (ensure/versioning)│   │    (descriptor)    │  │
//! │  └───────────────┘   └─────────┬──────────┘   └────────────────────┘  │
//! ├────────────────────────────────┼─────────────────────────────────────┤
//! │                         Object Store Backends                         │
//! │           ┌────────────────────┴───────────────────────┐              │
//! │           │  S3 (aws-sdk-s3)   │   Memory (dry runs)   │              │
//! │           └────────────────────────────────────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provisioner`]: Name templates, bucket store, volume assembly, workflow
//! - [`backends`]: Object store adapters
//! - [`controller`]: Kubernetes claim controller
//! - [`domain`]: Core domain types and traits
//! - [`config`]: Startup configuration
//! - [`metrics`]: Prometheus collectors
//! - [`error`]: Error types and handling

pub mod backends;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod provisioner;

// Re-export commonly used types
pub use backends::{BackendConfig, BackendFactory, BackendKind, MemoryObjectStore, S3ObjectStore};

pub use config::{MountConfig, ProvisionerConfig, DEFAULT_PROVISIONER_NAME};

pub use domain::ports::{
    AccessMode, FlexMount, ObjectStore, ObjectStoreRef, ProvisionRequest, ReclaimPolicy,
    VolumeDescriptor, VolumeProvisioner, VolumeProvisionerRef,
};

pub use error::{Error, ErrorAction, Result};

pub use metrics::ProvisionMetrics;

pub use provisioner::{
    BucketStore, EnsureOutcome, NameTemplate, ProvisionStage, ProvisionWorkflow, TemplateField,
    VolumeAssembler,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
