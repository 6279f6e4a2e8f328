//! S3 Object Store Adapter
//!
//! Creates and configures buckets through the AWS SDK. Works against AWS and
//! S3-compatible stores reachable through a custom endpoint.

use crate::domain::ports::ObjectStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
    VersioningConfiguration,
};
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

/// Region in which S3 rejects an explicit location constraint
const DEFAULT_S3_REGION: &str = "us-east-1";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the S3 adapter
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Region the client signs requests for
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_S3_REGION.to_string(),
            endpoint: None,
        }
    }
}

// =============================================================================
// S3 Adapter
// =============================================================================

/// Adapter for S3 bucket provisioning
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain
    pub async fn new(config: S3Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = config.endpoint {
            info!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_bucket(&self, name: &str, region: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(name);
        if region != DEFAULT_S3_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(output) => {
                debug!(bucket = %name, location = ?output.location(), "CreateBucket succeeded");
                Ok(())
            }
            Err(err) => Err(map_create_error(name, err)),
        }
    }

    async fn set_versioning(&self, name: &str, enabled: bool) -> Result<()> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };

        self.client
            .put_bucket_versioning()
            .bucket(name)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| {
                Error::provisioning(name, "put_bucket_versioning", DisplayErrorContext(&e))
            })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_buckets().send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(error = %DisplayErrorContext(&e), "S3 health check failed");
                Ok(false)
            }
        }
    }

    fn backend_name(&self) -> &str {
        "s3"
    }
}

/// Translate a CreateBucket failure into the store's error contract
fn map_create_error<R>(name: &str, err: SdkError<CreateBucketError, R>) -> Error
where
    R: std::fmt::Debug,
{
    // Both variants are 409 conflicts for an existing name
    if let Some(service_err) = err.as_service_error() {
        if service_err.is_bucket_already_owned_by_you() || service_err.is_bucket_already_exists()
        {
            return Error::bucket_exists(name);
        }
    }
    let reason = DisplayErrorContext(&err).to_string();
    warn!(bucket = %name, error = %reason, "CreateBucket failed");
    Error::provisioning(name, "create_bucket", reason)
}
