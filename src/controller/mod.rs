//! Claim Controller
//!
//! Watches persistent volume claims and provisions a bucket-backed volume for
//! every pending claim whose storage class names this provisioner.
//!
//! Released volumes are not watched. Every volume is created with the
//! `Retain` policy, so Kubernetes never asks for a delete and
//! [`VolumeProvisioner::deprovision`](crate::domain::ports::VolumeProvisioner::deprovision)
//! has no caller here.

pub mod claims;

use crate::domain::ports::VolumeProvisionerRef;
use crate::error::{Error, ErrorAction, Result};

use futures::StreamExt;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, PostParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Requeue delay for errors without a specific delay
const BACKOFF_REQUEUE: Duration = Duration::from_secs(15);

/// Shared context for the controller
pub struct ControllerContext {
    /// Kubernetes client
    pub client: Client,

    /// Provisioner handling claims
    pub provisioner: VolumeProvisionerRef,

    /// Storage class provisioner name this controller answers to
    pub provisioner_name: String,
}

impl ControllerContext {
    /// Create a new controller context
    pub fn new(
        client: Client,
        provisioner: VolumeProvisionerRef,
        provisioner_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            provisioner,
            provisioner_name: provisioner_name.into(),
        })
    }
}

/// Run the claim controller until a shutdown signal arrives
pub async fn run(ctx: Arc<ControllerContext>) -> Result<()> {
    let claims: Api<PersistentVolumeClaim> = Api::all(ctx.client.clone());

    info!(provisioner = %ctx.provisioner_name, "Starting claim controller");

    Controller::new(claims, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {:?}", o),
                Err(e) => warn!("Reconcile failed: {}", e),
            }
        })
        .await;

    info!("Controller shutdown complete");
    Ok(())
}

/// Reconcile a single claim
#[instrument(skip(claim, ctx), fields(claim = %claims::claim_key(&claim)))]
async fn reconcile(
    claim: Arc<PersistentVolumeClaim>,
    ctx: Arc<ControllerContext>,
) -> std::result::Result<Action, Error> {
    if !claims::needs_volume(&claim) {
        return Ok(Action::await_change());
    }

    let Some(class_name) = claims::storage_class_name(&claim) else {
        debug!("Claim has no storage class, skipping");
        return Ok(Action::await_change());
    };

    let classes: Api<StorageClass> = Api::all(ctx.client.clone());
    let Some(class) = classes.get_opt(&class_name).await? else {
        debug!(storage_class = %class_name, "StorageClass not found yet");
        return Ok(Action::requeue(Duration::from_secs(60)));
    };

    if class.provisioner != ctx.provisioner_name {
        debug!(
            storage_class = %class_name,
            provisioner = %class.provisioner,
            "Claim belongs to another provisioner"
        );
        return Ok(Action::await_change());
    }

    let volume_name = claims::volume_name_for(&claim)?;
    let request = claims::provision_request(&claim, &volume_name)?;
    let descriptor = ctx.provisioner.provision(&request).await?;
    let volume = claims::persistent_volume(&descriptor, &claim, &ctx.provisioner_name);

    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());
    match volumes.create(&PostParams::default(), &volume).await {
        Ok(_) => {
            info!(volume = %descriptor.name, "Created persistent volume");
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            // A retry after the volume was created; only fine if it is ours
            let existing = volumes.get(&descriptor.name).await?;
            if !claims::is_bound_to(&existing, &claim) {
                return Err(Error::InvalidClaim {
                    claim: claims::claim_key(&claim),
                    reason: format!(
                        "volume {} already exists for another claim",
                        descriptor.name
                    ),
                });
            }
            debug!(volume = %descriptor.name, "Persistent volume already exists");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Action::await_change())
}

/// Map reconcile errors to requeue actions
fn error_policy(
    _claim: Arc<PersistentVolumeClaim>,
    error: &Error,
    _ctx: Arc<ControllerContext>,
) -> Action {
    error!(retryable = error.is_retryable(), "Reconciliation error: {}", error);
    requeue_action(error)
}

fn requeue_action(error: &Error) -> Action {
    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(BACKOFF_REQUEUE),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}
