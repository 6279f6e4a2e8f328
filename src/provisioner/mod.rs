//! Provisioning Core
//!
//! Name rendering, idempotent bucket setup and volume assembly, tied
//! together by the [`ProvisionWorkflow`].

pub mod bucket_store;
pub mod naming;
pub mod volume;
pub mod workflow;

pub use bucket_store::{BucketStore, EnsureOutcome};
pub use naming::{validate_bucket_name, NameTemplate, TemplateField, DEFAULT_NAME_TEMPLATE};
pub use volume::{VolumeAssembler, BUCKET_NAME_OPTION, MAX_CAPACITY};
pub use workflow::{ProvisionStage, ProvisionWorkflow};
