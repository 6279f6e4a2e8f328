//! Provision Workflow
//!
//! Runs one provision attempt through its stages:
//!
//! ```text
//! Start -> NameRendered -> ResourceEnsured -> VersioningEnabled -> DescriptorReady
//!   \____________\_______________\__________________\___________-> Failed
//! ```
//!
//! Any stage error aborts the attempt and is returned unchanged; no partial
//! descriptor is produced. Every stage is safe to repeat, so the caller may
//! retry the whole attempt.

use crate::config::ProvisionerConfig;
use crate::domain::ports::{
    ObjectStoreRef, ProvisionRequest, ReclaimPolicy, VolumeDescriptor, VolumeProvisioner,
};
use crate::error::Result;
use crate::metrics::ProvisionMetrics;
use crate::provisioner::bucket_store::{BucketStore, EnsureOutcome};
use crate::provisioner::naming::validate_bucket_name;
use crate::provisioner::volume::VolumeAssembler;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Stage reached by a provision attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionStage {
    Start,
    NameRendered,
    ResourceEnsured,
    VersioningEnabled,
    DescriptorReady,
}

impl ProvisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStage::Start => "start",
            ProvisionStage::NameRendered => "name_rendered",
            ProvisionStage::ResourceEnsured => "resource_ensured",
            ProvisionStage::VersioningEnabled => "versioning_enabled",
            ProvisionStage::DescriptorReady => "descriptor_ready",
        }
    }

    /// Step that runs after this stage; names the failing step of an attempt
    /// that stopped here
    pub fn next_step(&self) -> &'static str {
        match self {
            ProvisionStage::Start => "render_name",
            ProvisionStage::NameRendered => "ensure_bucket",
            ProvisionStage::ResourceEnsured => "enable_versioning",
            ProvisionStage::VersioningEnabled => "assemble_descriptor",
            ProvisionStage::DescriptorReady => "respond",
        }
    }
}

impl std::fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisions versioned buckets and describes them as volumes
pub struct ProvisionWorkflow {
    config: Arc<ProvisionerConfig>,
    store: BucketStore,
    assembler: VolumeAssembler,
    metrics: Option<ProvisionMetrics>,
}

impl ProvisionWorkflow {
    /// Create a workflow over an object store
    pub fn new(config: ProvisionerConfig, backend: ObjectStoreRef) -> Self {
        let assembler = VolumeAssembler::new(config.mount.clone());
        Self {
            config: Arc::new(config),
            store: BucketStore::new(backend),
            assembler,
            metrics: None,
        }
    }

    /// Record provision outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: ProvisionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Check that the backing store is reachable
    pub async fn health_check(&self) -> Result<bool> {
        self.store.backend().health_check().await
    }

    /// Provision a bucket-backed volume for `request`
    #[instrument(
        skip(self, request),
        fields(namespace = %request.namespace, claim = %request.claim_name)
    )]
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<VolumeDescriptor> {
        let started = Instant::now();
        let mut stage = ProvisionStage::Start;

        match self.run(request, &mut stage).await {
            Ok((descriptor, outcome)) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(outcome, started.elapsed());
                }
                Ok(descriptor)
            }
            Err(e) => {
                warn!(
                    stage = %stage,
                    step = stage.next_step(),
                    error = %e,
                    "Provision attempt failed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(stage, started.elapsed());
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &ProvisionRequest,
        stage: &mut ProvisionStage,
    ) -> Result<(VolumeDescriptor, EnsureOutcome)> {
        let name = self.config.name_template.render(request)?;
        if self.config.validate_names {
            validate_bucket_name(&name)?;
        }
        *stage = ProvisionStage::NameRendered;

        info!(bucket = %name, region = %self.config.region, "Provisioning bucket");

        let outcome = self.store.ensure(&name, &self.config.region).await?;
        *stage = ProvisionStage::ResourceEnsured;

        // Also runs for existing buckets: an earlier attempt may have stopped
        // before versioning was set.
        self.store.enable_versioning(&name).await?;
        *stage = ProvisionStage::VersioningEnabled;

        let descriptor = self.assembler.assemble(&name, request);
        *stage = ProvisionStage::DescriptorReady;

        info!(bucket = %name, outcome = %outcome, "Responding with volume descriptor");
        if let Ok(json) = descriptor.to_json() {
            debug!(descriptor = %json, "Volume descriptor");
        }
        Ok((descriptor, outcome))
    }

    /// Release a volume
    ///
    /// The bucket and its data are always kept; reclaiming them is left to
    /// an out-of-band process.
    pub async fn deprovision(&self, descriptor: &VolumeDescriptor) -> Result<()> {
        if descriptor.reclaim_policy != ReclaimPolicy::Retain {
            warn!(
                bucket = %descriptor.name,
                policy = %descriptor.reclaim_policy,
                "Bucket deletion is not supported; retaining bucket"
            );
        }
        info!(bucket = %descriptor.name, "Volume released; bucket retained");

        if let Some(metrics) = &self.metrics {
            metrics.record_deprovision();
        }
        Ok(())
    }
}

#[async_trait]
impl VolumeProvisioner for ProvisionWorkflow {
    async fn provision(&self, request: &ProvisionRequest) -> Result<VolumeDescriptor> {
        ProvisionWorkflow::provision(self, request).await
    }

    async fn deprovision(&self, descriptor: &VolumeDescriptor) -> Result<()> {
        ProvisionWorkflow::deprovision(self, descriptor).await
    }
}
