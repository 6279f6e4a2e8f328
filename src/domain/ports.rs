//! Domain Ports - Core types and trait definitions for the provisioner
//!
//! These traits define the boundaries between the provisioning logic and
//! external systems. Adapters implement these traits to provide concrete
//! functionality.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Access Modes
// =============================================================================

/// Volume access mode requested by a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
    ReadWriteOncePod,
}

impl AccessMode {
    /// Kubernetes spelling of the access mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadOnlyMany => "ReadOnlyMany",
            AccessMode::ReadWriteMany => "ReadWriteMany",
            AccessMode::ReadWriteOncePod => "ReadWriteOncePod",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ReadWriteOnce" => Ok(AccessMode::ReadWriteOnce),
            "ReadOnlyMany" => Ok(AccessMode::ReadOnlyMany),
            "ReadWriteMany" => Ok(AccessMode::ReadWriteMany),
            "ReadWriteOncePod" => Ok(AccessMode::ReadWriteOncePod),
            other => Err(Error::Internal(format!("Unknown access mode: {}", other))),
        }
    }
}

/// Reclaim policy applied to a released volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReclaimPolicy {
    Retain,
    Delete,
}

impl ReclaimPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimPolicy::Retain => "Retain",
            ReclaimPolicy::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for ReclaimPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Provisioning Request/Descriptor
// =============================================================================

/// Request to provision a bucket-backed volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Namespace of the claim
    pub namespace: String,
    /// Name of the claim
    pub claim_name: String,
    /// Volume name proposed by the controller
    pub volume_name: String,
    /// Access modes requested by the claim
    pub access_modes: Vec<AccessMode>,
}

/// FlexVolume mount configuration handed to the node driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexMount {
    /// Mount driver identifier
    pub driver: String,
    /// Filesystem type
    pub fs_type: String,
    /// Driver options
    pub options: BTreeMap<String, String>,
}

/// Orchestrator-facing description of a provisioned volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// Resource name, shared by the bucket and the volume
    pub name: String,
    /// What happens to the bucket when the volume is released
    pub reclaim_policy: ReclaimPolicy,
    /// Access modes echoed from the request
    pub access_modes: Vec<AccessMode>,
    /// Capacity quantity (e.g. "8.0E")
    pub capacity: String,
    /// Mount configuration
    pub mount: FlexMount,
}

impl VolumeDescriptor {
    /// Render the descriptor as compact JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to encode descriptor: {}", e)))
    }
}

// =============================================================================
// Object Store Port
// =============================================================================

/// Port for the backing object store
///
/// `create_bucket` must report a bucket that already exists as
/// [`Error::ResourceExists`] with kind `Bucket`, and must not use that variant
/// for any other failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a bucket in the given region
    async fn create_bucket(&self, name: &str, region: &str) -> Result<()>;

    /// Enable or suspend object versioning on a bucket
    async fn set_versioning(&self, name: &str, enabled: bool) -> Result<()>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get backend name
    fn backend_name(&self) -> &str;
}

// =============================================================================
// Volume Provisioner Port
// =============================================================================

/// Port used by the claim controller to provision and release volumes
#[async_trait]
pub trait VolumeProvisioner: Send + Sync {
    /// Provision a volume for the request
    async fn provision(&self, request: &ProvisionRequest) -> Result<VolumeDescriptor>;

    /// Release a previously provisioned volume
    async fn deprovision(&self, descriptor: &VolumeDescriptor) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ObjectStoreRef = Arc<dyn ObjectStore>;
pub type VolumeProvisionerRef = Arc<dyn VolumeProvisioner>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_round_trip_names() {
        assert_eq!(format!("{}", AccessMode::ReadWriteMany), "ReadWriteMany");
        assert_eq!(
            "ReadOnlyMany".parse::<AccessMode>().unwrap(),
            AccessMode::ReadOnlyMany
        );
        assert!("ReadWriteSometimes".parse::<AccessMode>().is_err());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = VolumeDescriptor {
            name: "team-a-pv-1".into(),
            reclaim_policy: ReclaimPolicy::Retain,
            access_modes: vec![AccessMode::ReadWriteMany],
            capacity: "8.0E".into(),
            mount: FlexMount {
                driver: "pnx/volume".into(),
                fs_type: "fuse".into(),
                options: BTreeMap::from([("Name".to_string(), "team-a-pv-1".to_string())]),
            },
        };

        let json: serde_json::Value = serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();

        assert_eq!(json["name"], "team-a-pv-1");
        assert_eq!(json["reclaimPolicy"], "Retain");
        assert_eq!(json["accessModes"][0], "ReadWriteMany");
        assert_eq!(json["capacity"], "8.0E");
        assert_eq!(json["mount"]["fsType"], "fuse");
        assert_eq!(json["mount"]["options"]["Name"], "team-a-pv-1");
    }

    #[test]
    fn test_reclaim_policy_display() {
        assert_eq!(format!("{}", ReclaimPolicy::Retain), "Retain");
        assert_eq!(format!("{}", ReclaimPolicy::Delete), "Delete");
    }
}
