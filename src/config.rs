//! Provisioner Configuration
//!
//! Process-wide settings read once at startup. The resulting
//! [`ProvisionerConfig`] is immutable and passed explicitly to the workflow.

use crate::error::{Error, Result};
use crate::provisioner::naming::NameTemplate;
use tracing::warn;

/// Provisioner name the controller answers to by default
pub const DEFAULT_PROVISIONER_NAME: &str = "s3.aws.skpr.io/riofs";

/// FlexVolume driver used to mount buckets by default
pub const DEFAULT_FLEX_DRIVER: &str = "pnx/volume";

/// Filesystem type reported to the FlexVolume driver by default
pub const DEFAULT_FLEX_FS_TYPE: &str = "fuse";

// =============================================================================
// Mount Configuration
// =============================================================================

/// FlexVolume settings placed on every provisioned volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// FlexVolume driver identifier
    pub driver: String,
    /// Filesystem type
    pub fs_type: String,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_FLEX_DRIVER.to_string(),
            fs_type: DEFAULT_FLEX_FS_TYPE.to_string(),
        }
    }
}

// =============================================================================
// Provisioner Configuration
// =============================================================================

/// Immutable provisioner configuration
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Region buckets are created in
    pub region: String,
    /// Template used to derive bucket names
    pub name_template: NameTemplate,
    /// Check rendered names against S3 bucket rules before creating anything
    pub validate_names: bool,
    /// Mount settings for provisioned volumes
    pub mount: MountConfig,
}

impl ProvisionerConfig {
    /// Build a configuration from raw startup values
    ///
    /// A missing or blank region is a configuration error. A missing or empty
    /// template falls back to the default template.
    pub fn new(region: Option<&str>, name_template: Option<&str>) -> Result<Self> {
        let region = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                Error::Configuration("environment variable AWS_REGION not found".into())
            })?;

        let name_template = match name_template.filter(|t| !t.is_empty()) {
            Some(source) => NameTemplate::parse(source)?,
            None => NameTemplate::default(),
        };

        if name_template.fields().next().is_none() {
            warn!(
                template = %name_template,
                "Name template references no claim fields; every claim maps to the same bucket"
            );
        }

        Ok(Self {
            region: region.to_string(),
            name_template,
            validate_names: true,
            mount: MountConfig::default(),
        })
    }

    /// Disable or enable bucket name validation
    pub fn with_name_validation(mut self, enabled: bool) -> Self {
        self.validate_names = enabled;
        self
    }

    /// Override the mount settings
    pub fn with_mount(mut self, mount: MountConfig) -> Self {
        self.mount = mount;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::naming::DEFAULT_NAME_TEMPLATE;
    use assert_matches::assert_matches;

    #[test]
    fn test_region_required() {
        assert_matches!(
            ProvisionerConfig::new(None, None),
            Err(Error::Configuration(_))
        );
        assert_matches!(
            ProvisionerConfig::new(Some("  "), None),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_default_template() {
        let config = ProvisionerConfig::new(Some("us-east-1"), None).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.name_template.as_str(), DEFAULT_NAME_TEMPLATE);
        assert!(config.validate_names);
        assert_eq!(config.mount, MountConfig::default());

        let config = ProvisionerConfig::new(Some("us-east-1"), Some("")).unwrap();
        assert_eq!(config.name_template.as_str(), DEFAULT_NAME_TEMPLATE);
    }

    #[test]
    fn test_malformed_template_is_fatal() {
        assert_matches!(
            ProvisionerConfig::new(Some("us-east-1"), Some("{namespace")),
            Err(Error::TemplateSyntax { .. })
        );
    }

    #[test]
    fn test_builders() {
        let config = ProvisionerConfig::new(Some("ap-southeast-2"), Some("{claimName}"))
            .unwrap()
            .with_name_validation(false)
            .with_mount(MountConfig {
                driver: "acme/s3fs".into(),
                fs_type: "fuse.s3fs".into(),
            });

        assert!(!config.validate_names);
        assert_eq!(config.mount.driver, "acme/s3fs");
        assert_eq!(config.name_template.as_str(), "{claimName}");
    }
}
