//! Error taxonomy for token issuance and signing-key rotation.
//!
//! Three classes of failure exist:
//! - fatal: no usable active signing credential, the service must not sign
//! - rejected request: surfaced to the caller as a protocol-level rejection
//! - transient: remote store failures, retried by the next refresh cycle

use rust_common::PlatformError;
use thiserror::Error;

use crate::pipeline::{Rejection, RejectionKind};

/// Errors raised by the token issuer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum IssuerError {
    /// The certificate configuration parameter is missing or undecodable
    #[error("Certificate configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// The active certificate could not be resolved into a signing credential
    #[error("No active signing credential could be resolved for certificate {hash}")]
    NoActiveCredential {
        /// Hash of the active certificate named by the configuration
        hash: String,
    },

    /// A token was requested before any signing credential was installed
    #[error("No signing credential installed")]
    NoSigningCredential,

    /// Grant type or grant parameters are not acceptable
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// The caller is not allowed to perform the requested grant
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A presented token failed validation
    #[error("Token invalid: {0}")]
    TokenInvalid(String),

    /// Token encoding failed
    #[error("JWT encoding error: {0}")]
    JwtEncoding(String),

    /// Role or claim lookup failed
    #[error("Directory lookup failed: {0}")]
    Directory(String),

    /// Service configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller aborted the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// A remote platform call failed
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl IssuerError {
    /// Create an invalid grant error.
    #[must_use]
    pub fn invalid_grant(msg: impl Into<String>) -> Self {
        Self::InvalidGrant(msg.into())
    }

    /// Create an unauthorized error.
    #[must_use]
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a token invalid error.
    #[must_use]
    pub fn token_invalid(msg: impl Into<String>) -> Self {
        Self::TokenInvalid(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The service cannot sign tokens correctly after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoActiveCredential { .. } | Self::NoSigningCredential
        )
    }

    /// The error describes a bad request rather than a server fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidGrant(_) | Self::Unauthorized(_) | Self::TokenInvalid(_)
        )
    }

    /// Stable error code for logs and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable(_) => TOKEN_CONFIG_UNAVAILABLE,
            Self::NoActiveCredential { .. } | Self::NoSigningCredential => {
                TOKEN_NO_SIGNING_CREDENTIAL
            }
            Self::InvalidGrant(_) => TOKEN_INVALID_GRANT,
            Self::Unauthorized(_) => TOKEN_UNAUTHORIZED,
            Self::TokenInvalid(_) => TOKEN_INVALID,
            Self::JwtEncoding(_) => TOKEN_ENCODING_ERROR,
            Self::Directory(_) => TOKEN_DIRECTORY_ERROR,
            Self::Config(_) => TOKEN_CONFIG_ERROR,
            Self::Cancelled => TOKEN_CANCELLED,
            Self::Platform(_) => TOKEN_PLATFORM_ERROR,
        }
    }

    /// Convert into the rejection returned to the caller.
    ///
    /// Server faults never leak their details.
    #[must_use]
    pub fn to_rejection(&self) -> Rejection {
        match self {
            Self::InvalidGrant(msg) => Rejection::new(RejectionKind::InvalidGrant, msg.clone()),
            Self::Unauthorized(msg) => {
                Rejection::new(RejectionKind::UnauthorizedClient, msg.clone())
            }
            Self::TokenInvalid(_) => Rejection::new(
                RejectionKind::InvalidGrant,
                "The presented access token is invalid",
            ),
            _ => Rejection::new(
                RejectionKind::ServerError,
                "The token could not be issued",
            ),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for IssuerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::token_invalid("token expired"),
            ErrorKind::ImmatureSignature => Self::token_invalid("token not yet valid"),
            ErrorKind::InvalidSignature => Self::token_invalid("signature invalid"),
            ErrorKind::InvalidIssuer => Self::token_invalid("issuer mismatch"),
            ErrorKind::InvalidAudience => Self::token_invalid("audience mismatch"),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                Self::token_invalid("token malformed")
            }
            _ => Self::JwtEncoding(err.to_string()),
        }
    }
}

/// Certificate configuration unavailable.
pub const TOKEN_CONFIG_UNAVAILABLE: &str = "TOKEN_CONFIG_UNAVAILABLE";
/// No usable signing credential.
pub const TOKEN_NO_SIGNING_CREDENTIAL: &str = "TOKEN_NO_SIGNING_CREDENTIAL";
/// Invalid grant.
pub const TOKEN_INVALID_GRANT: &str = "TOKEN_INVALID_GRANT";
/// Unauthorized caller.
pub const TOKEN_UNAUTHORIZED: &str = "TOKEN_UNAUTHORIZED";
/// Presented token invalid.
pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
/// Token encoding failure.
pub const TOKEN_ENCODING_ERROR: &str = "TOKEN_ENCODING_ERROR";
/// Directory lookup failure.
pub const TOKEN_DIRECTORY_ERROR: &str = "TOKEN_DIRECTORY_ERROR";
/// Invalid configuration.
pub const TOKEN_CONFIG_ERROR: &str = "TOKEN_CONFIG_ERROR";
/// Cancelled operation.
pub const TOKEN_CANCELLED: &str = "TOKEN_CANCELLED";
/// Remote platform failure.
pub const TOKEN_PLATFORM_ERROR: &str = "TOKEN_PLATFORM_ERROR";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(IssuerError::NoActiveCredential {
            hash: "abc".to_string()
        }
        .is_fatal());
        assert!(IssuerError::NoSigningCredential.is_fatal());
        assert!(!IssuerError::ConfigUnavailable("missing".to_string()).is_fatal());
        assert!(!IssuerError::invalid_grant("bad").is_fatal());
    }

    #[test]
    fn test_rejection_classification() {
        assert!(IssuerError::invalid_grant("bad").is_rejection());
        assert!(IssuerError::unauthorized("no role").is_rejection());
        assert!(IssuerError::token_invalid("expired").is_rejection());
        assert!(!IssuerError::Cancelled.is_rejection());
        assert!(!IssuerError::NoSigningCredential.is_rejection());
    }

    #[test]
    fn test_rejection_mapping() {
        let rejection = IssuerError::invalid_grant("wrong grant").to_rejection();
        assert_eq!(rejection.kind, RejectionKind::InvalidGrant);
        assert_eq!(rejection.description, "wrong grant");

        let rejection = IssuerError::unauthorized("missing role").to_rejection();
        assert_eq!(rejection.kind, RejectionKind::UnauthorizedClient);
    }

    #[test]
    fn test_server_faults_are_sanitized() {
        let err = IssuerError::Platform(PlatformError::internal("s3 credentials leaked"));
        let rejection = err.to_rejection();
        assert_eq!(rejection.kind, RejectionKind::ServerError);
        assert!(!rejection.description.contains("s3"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(IssuerError::Cancelled.code(), TOKEN_CANCELLED);
        assert_eq!(
            IssuerError::NoActiveCredential {
                hash: "h".to_string()
            }
            .code(),
            TOKEN_NO_SIGNING_CREDENTIAL
        );
        assert_eq!(IssuerError::invalid_grant("x").code(), TOKEN_INVALID_GRANT);
    }
}
