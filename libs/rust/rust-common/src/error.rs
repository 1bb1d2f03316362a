//! Errors for calls to remote platform stores.
//!
//! Services put their parameter-store, object-store and directory clients
//! behind traits failing with [`PlatformError`], so a refresh loop can tell
//! a transient outage from a permanent misconfiguration.

use thiserror::Error;

/// Failure of a remote platform call.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The named parameter, object or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials lack permission for the resource
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The remote service could not be reached or answered with a fault
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The remote service asked the caller to slow down
    #[error("Throttled: {0}")]
    Throttled(String),

    /// No answer within the client deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A payload could not be decoded
    #[error("Malformed payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller gave up before the call completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Whether the same call may succeed later without any change on our side.
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// assert!(PlatformError::unavailable("ssm").is_retryable());
    /// assert!(!PlatformError::not_found("/certs").is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Throttled(_) | Self::Timeout(_)
        )
    }

    /// The resource is missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Missing resource.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Unreachable or faulting service.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Catch-all failure.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
