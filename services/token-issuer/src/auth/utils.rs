//! Claims, scope and ticket builders shared by the grant handlers.

use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use super::IMPERSONATOR_ROLE;
use crate::certificates::CertificateManager;
use crate::config::Config;
use crate::error::IssuerError;
use crate::identity::claims::{NAME, ROLE, SUBJECT};
use crate::identity::{
    AuthenticationTicket, Claim, ClaimsIdentity, ClaimsPrincipal, Destination, PrincipalDirectory,
    AUTHENTICATION_SCHEME,
};
use crate::jwt::{JwtBuilder, JwtSerializer};

const BOTH_TOKENS: &[Destination] = &[Destination::AccessToken, Destination::IdentityToken];

/// Lifetime of tokens produced by [`AuthUtils::encode_token`].
pub const ENCODED_TOKEN_TTL_SECONDS: i64 = 3600;

/// Builders used by [`super::AuthService`].
pub struct AuthUtils {
    directory: Arc<dyn PrincipalDirectory>,
    manager: Arc<CertificateManager>,
    issuer: String,
    server_identifier: String,
    default_scopes: Vec<String>,
}

impl AuthUtils {
    /// Create the builders from the service configuration.
    #[must_use]
    pub fn new(
        config: &Config,
        directory: Arc<dyn PrincipalDirectory>,
        manager: Arc<CertificateManager>,
    ) -> Self {
        Self {
            directory,
            manager,
            issuer: config.issuer_str().to_string(),
            server_identifier: config.audience.clone(),
            default_scopes: config.default_scopes.clone(),
        }
    }

    /// Identifier of this server, used as issuer and resource indicator.
    #[must_use]
    pub fn server_identifier(&self) -> &str {
        &self.server_identifier
    }

    /// Identity of an application (OAuth client).
    ///
    /// # Errors
    ///
    /// Propagates directory failures.
    pub async fn create_application_identity(
        &self,
        application_id: Uuid,
    ) -> Result<ClaimsIdentity, IssuerError> {
        let roles = self.directory.find_roles_for_application(application_id).await?;
        let id = application_id.to_string();
        build_identity(id.clone(), id, &roles)
    }

    /// Identity of a user. The name falls back to the user id.
    ///
    /// # Errors
    ///
    /// Propagates directory failures.
    pub async fn create_user_identity(&self, user_id: Uuid) -> Result<ClaimsIdentity, IssuerError> {
        let roles = self.directory.find_roles_for_user(user_id).await?;
        let id = user_id.to_string();
        let name = self
            .directory
            .find_user_name(user_id)
            .await?
            .unwrap_or_else(|| id.clone());
        build_identity(id, name, &roles)
    }

    /// Scopes to grant for a request asking for `requested`.
    #[must_use]
    pub fn negotiate_scopes(&self, requested: Option<&str>) -> Vec<String> {
        negotiate_scopes(requested, &self.default_scopes)
    }

    /// Wrap `principal` into a ticket for this server as resource.
    #[must_use]
    pub fn create_ticket(
        &self,
        principal: ClaimsPrincipal,
        scopes: Vec<String>,
        redirect_uri: Option<String>,
    ) -> AuthenticationTicket {
        AuthenticationTicket::new(principal, AUTHENTICATION_SCHEME)
            .with_scopes(scopes)
            .with_resources(vec![self.server_identifier.clone()])
            .with_redirect_uri(redirect_uri)
    }

    /// Sign the access-token claims of `principal` directly, outside the
    /// exchange flow. One hour lifetime, this server as issuer and audience.
    ///
    /// # Errors
    ///
    /// [`IssuerError::NoSigningCredential`] before the first certificate
    /// update, [`IssuerError::JwtEncoding`] if the principal has no subject.
    pub fn encode_token(&self, principal: &ClaimsPrincipal) -> Result<String, IssuerError> {
        let credential = self.manager.signing_credential()?;
        let claims = JwtBuilder::new(self.issuer.clone())
            .principal(principal, Destination::AccessToken)
            .audience(vec![self.server_identifier.clone()])
            .lifetime_secs(ENCODED_TOKEN_TTL_SECONDS)
            .build()?;
        JwtSerializer::serialize(&claims, &credential)
    }
}

/// Name and subject go to both tokens; roles are encoded as one JSON array
/// string and go to the access token.
fn build_identity(
    subject: String,
    name: String,
    roles: &[String],
) -> Result<ClaimsIdentity, IssuerError> {
    let role_value = role_claim_value(roles)?;
    Ok(ClaimsIdentity::new(AUTHENTICATION_SCHEME)
        .with_claim(Claim::new(NAME, name).with_destinations(BOTH_TOKENS))
        .with_claim(Claim::new(SUBJECT, subject).with_destinations(BOTH_TOKENS))
        .with_claim(Claim::new(ROLE, role_value).with_destinations(&[Destination::AccessToken])))
}

/// Encode role names as a JSON array string.
///
/// # Errors
///
/// Serialization failure (not expected for strings).
pub fn role_claim_value(roles: &[String]) -> Result<String, IssuerError> {
    serde_json::to_string(roles).map_err(|e| IssuerError::Platform(e.into()))
}

/// Union of the space separated `requested` scopes and `defaults`.
///
/// Result is sorted and free of duplicates.
#[must_use]
pub fn negotiate_scopes(requested: Option<&str>, defaults: &[String]) -> Vec<String> {
    let mut scopes: BTreeSet<String> = defaults.iter().cloned().collect();
    scopes.extend(
        requested
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string),
    );
    scopes.into_iter().collect()
}

/// Whether `principal` may use the impersonation grant.
#[must_use]
pub fn is_impersonator(principal: &ClaimsPrincipal) -> bool {
    principal.has_role(IMPERSONATOR_ROLE)
}
