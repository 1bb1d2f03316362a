//! AWS-backed stores: SSM Parameter Store and S3.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use rust_common::PlatformError;
use tracing::debug;

use super::{ObjectStore, ParameterStore};

/// SSM Parameter Store client. SecureString parameters are decrypted.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Wrap an SSM client.
    #[must_use]
    pub const fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_ssm::Client::new(&config))
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, PlatformError> {
        debug!(parameter = %name, "Fetching SSM parameter");
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| {
                if matches!(err, SdkError::TimeoutError(_)) {
                    return PlatformError::Timeout(name.to_string());
                }
                let service_err = err.into_service_error();
                if service_err.is_parameter_not_found() {
                    PlatformError::not_found(name)
                } else {
                    classify(service_err.code(), service_err.to_string())
                }
            })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| PlatformError::not_found(name))
    }
}

/// Map an AWS error code onto the platform taxonomy.
fn classify(code: Option<&str>, detail: String) -> PlatformError {
    match code {
        Some("ThrottlingException" | "SlowDown" | "RequestLimitExceeded") => {
            PlatformError::Throttled(detail)
        }
        Some("AccessDeniedException" | "AccessDenied") => PlatformError::AccessDenied(detail),
        _ => PlatformError::unavailable(detail),
    }
}

/// S3 client.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Wrap an S3 client.
    #[must_use]
    pub const fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PlatformError> {
        debug!(bucket = %bucket, key = %key, "Fetching S3 object");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(service) if service.err().is_no_such_key() => {
                    PlatformError::not_found(format!("{bucket}/{key}"))
                }
                SdkError::TimeoutError(_) => PlatformError::Timeout(format!("{bucket}/{key}")),
                other => classify(other.code(), other.to_string()),
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| PlatformError::unavailable(err.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}
