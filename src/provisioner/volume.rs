//! Volume Descriptor Assembly

use crate::config::MountConfig;
use crate::domain::ports::{FlexMount, ProvisionRequest, ReclaimPolicy, VolumeDescriptor};
use std::collections::BTreeMap;

/// Capacity advertised for every bucket-backed volume
///
/// S3 does not bound bucket size, so the largest meaningful quantity is used.
pub const MAX_CAPACITY: &str = "8.0E";

/// Mount option carrying the bucket name
pub const BUCKET_NAME_OPTION: &str = "Name";

/// Builds volume descriptors for provisioned buckets
#[derive(Debug, Clone, Default)]
pub struct VolumeAssembler {
    mount: MountConfig,
}

impl VolumeAssembler {
    pub fn new(mount: MountConfig) -> Self {
        Self { mount }
    }

    /// Describe the volume for bucket `name`
    ///
    /// Volumes always retain their bucket on release.
    pub fn assemble(&self, name: &str, request: &ProvisionRequest) -> VolumeDescriptor {
        let mut options = BTreeMap::new();
        options.insert(BUCKET_NAME_OPTION.to_string(), name.to_string());

        VolumeDescriptor {
            name: name.to_string(),
            reclaim_policy: ReclaimPolicy::Retain,
            access_modes: request.access_modes.clone(),
            capacity: MAX_CAPACITY.to_string(),
            mount: FlexMount {
                driver: self.mount.driver.clone(),
                fs_type: self.mount.fs_type.clone(),
                options,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_FLEX_DRIVER, DEFAULT_FLEX_FS_TYPE};
    use crate::domain::ports::AccessMode;

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            namespace: "team-a".into(),
            claim_name: "uploads".into(),
            volume_name: "pv-123".into(),
            access_modes: vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany],
        }
    }

    #[test]
    fn test_assemble_defaults() {
        let descriptor = VolumeAssembler::default().assemble("team-a-pv-123", &request());

        assert_eq!(descriptor.name, "team-a-pv-123");
        assert_eq!(descriptor.reclaim_policy, ReclaimPolicy::Retain);
        assert_eq!(
            descriptor.access_modes,
            vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany]
        );
        assert_eq!(descriptor.capacity, "8.0E");
        assert_eq!(descriptor.mount.driver, DEFAULT_FLEX_DRIVER);
        assert_eq!(descriptor.mount.fs_type, DEFAULT_FLEX_FS_TYPE);
        assert_eq!(
            descriptor.mount.options.get("Name").map(String::as_str),
            Some("team-a-pv-123")
        );
        assert_eq!(descriptor.mount.options.len(), 1);
    }

    #[test]
    fn test_assemble_custom_mount() {
        let assembler = VolumeAssembler::new(MountConfig {
            driver: "acme/s3fs".into(),
            fs_type: "fuse.s3fs".into(),
        });
        let descriptor = assembler.assemble("bucket-1", &request());

        assert_eq!(descriptor.mount.driver, "acme/s3fs");
        assert_eq!(descriptor.mount.fs_type, "fuse.s3fs");
    }
}
