//! Claim Translation
//!
//! Converts between Kubernetes claim/volume objects and the provisioner's
//! request and descriptor types.

use crate::domain::ports::{AccessMode, ProvisionRequest, VolumeDescriptor};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    FlexPersistentVolumeSource, ObjectReference, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Annotation recording which provisioner created a volume
pub const PROVISIONED_BY_ANNOTATION: &str = "pv.kubernetes.io/provisioned-by";

/// Pre-`storageClassName` annotation some claims still carry
pub const LEGACY_STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

/// `namespace/name` of a claim, for logs and errors
pub fn claim_key(claim: &PersistentVolumeClaim) -> String {
    format!(
        "{}/{}",
        claim.namespace().unwrap_or_default(),
        claim.name_any()
    )
}

/// Whether the claim is still waiting for a volume
pub fn needs_volume(claim: &PersistentVolumeClaim) -> bool {
    let bound = claim
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.as_deref())
        .map(|v| !v.is_empty())
        .unwrap_or(false);

    let pending = claim
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == "Pending")
        .unwrap_or(true);

    !bound && pending && claim.metadata.deletion_timestamp.is_none()
}

/// Storage class requested by the claim, if any
pub fn storage_class_name(claim: &PersistentVolumeClaim) -> Option<String> {
    claim
        .spec
        .as_ref()
        .and_then(|s| s.storage_class_name.clone())
        .or_else(|| {
            claim
                .annotations()
                .get(LEGACY_STORAGE_CLASS_ANNOTATION)
                .cloned()
        })
        .filter(|c| !c.is_empty())
}

/// Volume name proposed for a claim (`pvc-<uid>`)
pub fn volume_name_for(claim: &PersistentVolumeClaim) -> Result<String> {
    claim
        .uid()
        .filter(|uid| !uid.is_empty())
        .map(|uid| format!("pvc-{}", uid))
        .ok_or_else(|| Error::InvalidClaim {
            claim: claim_key(claim),
            reason: "claim has no uid".into(),
        })
}

/// Build the provision request for a claim
pub fn provision_request(
    claim: &PersistentVolumeClaim,
    volume_name: &str,
) -> Result<ProvisionRequest> {
    let access_modes = claim
        .spec
        .as_ref()
        .and_then(|s| s.access_modes.as_ref())
        .map(|modes| {
            modes
                .iter()
                .map(|m| {
                    m.parse::<AccessMode>().map_err(|_| Error::InvalidClaim {
                        claim: claim_key(claim),
                        reason: format!("unsupported access mode {}", m),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(ProvisionRequest {
        namespace: claim.namespace().unwrap_or_default(),
        claim_name: claim.name_any(),
        volume_name: volume_name.to_string(),
        access_modes,
    })
}

/// Build the persistent volume object for a provisioned descriptor
pub fn persistent_volume(
    descriptor: &VolumeDescriptor,
    claim: &PersistentVolumeClaim,
    provisioner_name: &str,
) -> PersistentVolume {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        PROVISIONED_BY_ANNOTATION.to_string(),
        provisioner_name.to_string(),
    );

    let mut capacity = BTreeMap::new();
    capacity.insert("storage".to_string(), Quantity(descriptor.capacity.clone()));

    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(descriptor.name.clone()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            persistent_volume_reclaim_policy: Some(descriptor.reclaim_policy.to_string()),
            access_modes: Some(
                descriptor
                    .access_modes
                    .iter()
                    .map(|m| m.to_string())
                    .collect(),
            ),
            capacity: Some(capacity),
            flex_volume: Some(FlexPersistentVolumeSource {
                driver: descriptor.mount.driver.clone(),
                fs_type: Some(descriptor.mount.fs_type.clone()),
                options: Some(descriptor.mount.options.clone()),
                ..Default::default()
            }),
            claim_ref: Some(ObjectReference {
                api_version: Some("v1".to_string()),
                kind: Some("PersistentVolumeClaim".to_string()),
                name: Some(claim.name_any()),
                namespace: claim.namespace(),
                uid: claim.uid(),
                resource_version: claim.resource_version(),
                ..Default::default()
            }),
            storage_class_name: storage_class_name(claim),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Whether an existing volume was created for this claim
pub fn is_bound_to(volume: &PersistentVolume, claim: &PersistentVolumeClaim) -> bool {
    let claim_uid = claim.uid();
    volume
        .spec
        .as_ref()
        .and_then(|s| s.claim_ref.as_ref())
        .map(|r| claim_uid.is_some() && r.uid == claim_uid)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::VolumeAssembler;
    use assert_matches::assert_matches;
    use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, PersistentVolumeClaimStatus};

    fn claim() -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("uploads".into()),
                namespace: Some("team-a".into()),
                uid: Some("0f1e2d3c".into()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteMany".into()]),
                storage_class_name: Some("s3".into()),
                ..Default::default()
            }),
            status: Some(PersistentVolumeClaimStatus {
                phase: Some("Pending".into()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_provision_request_from_claim() {
        let claim = claim();
        let volume_name = volume_name_for(&claim).unwrap();
        let request = provision_request(&claim, &volume_name).unwrap();

        assert_eq!(volume_name, "pvc-0f1e2d3c");
        assert_eq!(request.namespace, "team-a");
        assert_eq!(request.claim_name, "uploads");
        assert_eq!(request.volume_name, "pvc-0f1e2d3c");
        assert_eq!(request.access_modes, vec![AccessMode::ReadWriteMany]);
    }

    #[test]
    fn test_unknown_access_mode() {
        let mut claim = claim();
        claim.spec.as_mut().unwrap().access_modes = Some(vec!["WriteSometimes".into()]);

        assert_matches!(
            provision_request(&claim, "pvc-1"),
            Err(Error::InvalidClaim { .. })
        );
    }

    #[test]
    fn test_missing_uid() {
        let mut claim = claim();
        claim.metadata.uid = None;
        assert_matches!(volume_name_for(&claim), Err(Error::InvalidClaim { .. }));
    }

    #[test]
    fn test_needs_volume() {
        let mut claim = claim();
        assert!(needs_volume(&claim));

        claim.spec.as_mut().unwrap().volume_name = Some("team-a-pv-123".into());
        assert!(!needs_volume(&claim));

        let mut claim = self::claim();
        claim.status.as_mut().unwrap().phase = Some("Bound".into());
        assert!(!needs_volume(&claim));
    }

    #[test]
    fn test_storage_class_fallback() {
        let mut claim = claim();
        assert_eq!(storage_class_name(&claim).as_deref(), Some("s3"));

        claim.spec.as_mut().unwrap().storage_class_name = None;
        assert_eq!(storage_class_name(&claim), None);

        claim.metadata.annotations = Some(BTreeMap::from([(
            LEGACY_STORAGE_CLASS_ANNOTATION.to_string(),
            "legacy-s3".to_string(),
        )]));
        assert_eq!(storage_class_name(&claim).as_deref(), Some("legacy-s3"));
    }

    #[test]
    fn test_persistent_volume_shape() {
        let claim = claim();
        let request = provision_request(&claim, "pvc-0f1e2d3c").unwrap();
        let descriptor = VolumeAssembler::default().assemble("team-a-pvc-0f1e2d3c", &request);

        let pv = persistent_volume(&descriptor, &claim, "s3.aws.skpr.io/riofs");

        assert_eq!(pv.metadata.name.as_deref(), Some("team-a-pvc-0f1e2d3c"));
        assert_eq!(
            pv.metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(PROVISIONED_BY_ANNOTATION))
                .map(String::as_str),
            Some("s3.aws.skpr.io/riofs")
        );

        let spec = pv.spec.as_ref().unwrap();
        assert_eq!(spec.persistent_volume_reclaim_policy.as_deref(), Some("Retain"));
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteMany".to_string()]));
        assert_eq!(
            spec.capacity.as_ref().unwrap().get("storage"),
            Some(&Quantity("8.0E".into()))
        );
        assert_eq!(spec.storage_class_name.as_deref(), Some("s3"));

        let flex = spec.flex_volume.as_ref().unwrap();
        assert_eq!(flex.driver, "pnx/volume");
        assert_eq!(flex.fs_type.as_deref(), Some("fuse"));
        assert_eq!(
            flex.options.as_ref().unwrap().get("Name").map(String::as_str),
            Some("team-a-pvc-0f1e2d3c")
        );

        assert!(is_bound_to(&pv, &claim));
    }

    #[test]
    fn test_is_bound_to_other_claim() {
        let claim = claim();
        let request = provision_request(&claim, "pvc-0f1e2d3c").unwrap();
        let descriptor = VolumeAssembler::default().assemble("shared", &request);
        let pv = persistent_volume(&descriptor, &claim, "s3.aws.skpr.io/riofs");

        let mut other = self::claim();
        other.metadata.uid = Some("99999999".into());
        assert!(!is_bound_to(&pv, &other));
    }
}
