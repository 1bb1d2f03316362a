//! Certificate configuration source.

use rust_common::PlatformError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::IssuerError;
use crate::stores::{cancellable, ParameterStore};

/// Which certificates are in effect and where they live.
///
/// Fetched fresh on every update cycle, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateConfiguration {
    /// Object-store bucket holding the certificate bundles
    pub bucket: String,
    /// Hash of the certificate used for signing
    pub active_hash: String,
    /// Hash of the previous certificate, kept for validation only
    #[serde(default)]
    pub inactive_hash: Option<String>,
}

impl CertificateConfiguration {
    fn validate(self) -> Result<Self, IssuerError> {
        if self.bucket.trim().is_empty() {
            return Err(IssuerError::ConfigUnavailable(
                "bucket is empty".to_string(),
            ));
        }
        if self.active_hash.trim().is_empty() {
            return Err(IssuerError::ConfigUnavailable(
                "activeHash is empty".to_string(),
            ));
        }
        Ok(Self {
            inactive_hash: self.inactive_hash.filter(|h| !h.trim().is_empty()),
            ..self
        })
    }
}

/// Reads the certificate configuration document from the parameter store.
#[derive(Clone)]
pub struct CertificateConfigurationSource {
    store: Arc<dyn ParameterStore>,
    parameter_name: String,
}

impl CertificateConfigurationSource {
    /// Create a source reading `parameter_name` from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ParameterStore>, parameter_name: impl Into<String>) -> Self {
        Self {
            store,
            parameter_name: parameter_name.into(),
        }
    }

    /// Name of the parameter read on every call.
    #[must_use]
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    /// Fetch and decode the current configuration.
    ///
    /// # Errors
    ///
    /// [`IssuerError::ConfigUnavailable`] when the parameter is missing,
    /// unreadable or undecodable, [`IssuerError::Cancelled`] when `cancel`
    /// fires first.
    #[instrument(skip(self, cancel), fields(parameter = %self.parameter_name))]
    pub async fn get_configuration(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CertificateConfiguration, IssuerError> {
        let raw = cancellable(cancel, self.store.get_parameter(&self.parameter_name))
            .await
            .map_err(|err| match err {
                PlatformError::Cancelled => IssuerError::Cancelled,
                other => IssuerError::ConfigUnavailable(other.to_string()),
            })?;

        let config: CertificateConfiguration = serde_json::from_str(&raw)
            .map_err(|e| IssuerError::ConfigUnavailable(format!("undecodable document: {e}")))?;
        let config = config.validate()?;

        debug!(
            bucket = %config.bucket,
            active = %config.active_hash,
            inactive = ?config.inactive_hash,
            "Certificate configuration loaded"
        );
        Ok(config)
    }
}
