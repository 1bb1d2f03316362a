//! Bearer token validation against the live credential set.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::certificates::CertificateManager;
use crate::error::IssuerError;
use crate::identity::claims::{CLIENT_ID, NAME, ROLE, SUBJECT};
use crate::identity::{Claim, ClaimsIdentity, ClaimsPrincipal, AUTHENTICATION_SCHEME};
use crate::jwt::claims::Claims;
use crate::jwt::serializer::JwtSerializer;

/// Scope claim type on validated principals.
pub const SCOPE: &str = "scope";

/// Turns a presented bearer token into the principal it was issued for.
#[async_trait]
pub trait AccessTokenValidator: Send + Sync {
    /// Validate `token` and extract its principal.
    async fn validate(&self, token: &str) -> Result<ClaimsPrincipal, IssuerError>;
}

/// Validates tokens issued by this server with any credential the manager
/// currently accepts, so tokens signed just before a rotation still verify.
#[derive(Clone)]
pub struct TokenValidator {
    manager: Arc<CertificateManager>,
    issuer: String,
    audience: String,
}

impl TokenValidator {
    /// Create a validator expecting `issuer` and `audience`.
    #[must_use]
    pub fn new(
        manager: Arc<CertificateManager>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Validate `token` and return its claims.
    ///
    /// # Errors
    ///
    /// [`IssuerError::TokenInvalid`] when the key id is unknown or any check fails.
    pub fn validate_claims(&self, token: &str) -> Result<Claims, IssuerError> {
        let kid = JwtSerializer::key_id(token)?;
        let credential = self.manager.find(&kid).ok_or_else(|| {
            debug!(kid = %kid, "Token signed with unknown key");
            IssuerError::token_invalid("unknown signing key")
        })?;

        JwtSerializer::deserialize(token, &credential, &self.issuer, &self.audience)
    }
}

#[async_trait]
impl AccessTokenValidator for TokenValidator {
    async fn validate(&self, token: &str) -> Result<ClaimsPrincipal, IssuerError> {
        self.validate_claims(token).map(|claims| principal_from_claims(&claims))
    }
}

/// Rebuild a principal from validated token claims.
#[must_use]
pub fn principal_from_claims(claims: &Claims) -> ClaimsPrincipal {
    let mut identity =
        ClaimsIdentity::new(AUTHENTICATION_SCHEME).with_claim(Claim::new(SUBJECT, &claims.sub));

    let optional = [
        (NAME, &claims.name),
        (ROLE, &claims.role),
        (CLIENT_ID, &claims.client_id),
        (SCOPE, &claims.scope),
    ];
    for (claim_type, value) in optional {
        if let Some(value) = value {
            identity.add_claim(Claim::new(claim_type, value));
        }
    }

    ClaimsPrincipal::new(identity)
}
