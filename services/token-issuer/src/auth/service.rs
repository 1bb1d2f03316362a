//! Grant handlers producing authentication tickets.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::utils::{is_impersonator, AuthUtils};
use crate::error::IssuerError;
use crate::identity::{AuthenticationTicket, ClaimsPrincipal};
use crate::jwt::AccessTokenValidator;
use crate::pipeline::GrantRequest;

/// Decides whether a validated caller may impersonate.
pub type ImpersonationCheck = Arc<dyn Fn(&ClaimsPrincipal) -> bool + Send + Sync>;

/// Ticket property naming the impersonating caller.
pub const IMPERSONATOR_PROPERTY: &str = "impersonator";

/// Builds tickets for the supported grants.
pub struct AuthService {
    utils: Arc<AuthUtils>,
    validator: Arc<dyn AccessTokenValidator>,
    impersonation_check: ImpersonationCheck,
}

impl AuthService {
    /// Create the service. Impersonation requires the impersonator role.
    #[must_use]
    pub fn new(utils: Arc<AuthUtils>, validator: Arc<dyn AccessTokenValidator>) -> Self {
        Self {
            utils,
            validator,
            impersonation_check: Arc::new(is_impersonator),
        }
    }

    /// Replace the impersonation role check.
    #[must_use]
    pub fn with_impersonation_check(mut self, check: ImpersonationCheck) -> Self {
        self.impersonation_check = check;
        self
    }

    /// Shared builders.
    #[must_use]
    pub const fn utils(&self) -> &Arc<AuthUtils> {
        &self.utils
    }

    /// Client credentials exchange: the client id names the application.
    ///
    /// # Errors
    ///
    /// [`IssuerError::InvalidGrant`] for another grant type or a missing or
    /// malformed client id; directory failures otherwise.
    #[instrument(skip_all, fields(client_id = ?request.client_id))]
    pub async fn client_exchange(
        &self,
        request: &GrantRequest,
    ) -> Result<AuthenticationTicket, IssuerError> {
        if !request.is_client_credentials() {
            return Err(IssuerError::invalid_grant(
                "The specified grant type is not supported",
            ));
        }

        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IssuerError::invalid_grant("The client id is missing"))?;
        let application_id = Uuid::parse_str(client_id)
            .map_err(|_| IssuerError::invalid_grant("The client id is not a valid application id"))?;

        let identity = self.utils.create_application_identity(application_id).await?;
        let scopes = self.utils.negotiate_scopes(request.scope.as_deref());

        Ok(self.utils.create_ticket(
            ClaimsPrincipal::new(identity),
            scopes,
            request.redirect_uri.clone(),
        ))
    }

    /// Impersonation exchange: the caller must pass the impersonation check;
    /// the ticket describes the impersonated user.
    ///
    /// `caller` is the principal the pipeline already extracted from the
    /// presented token. Without one the token is validated here.
    ///
    /// # Errors
    ///
    /// - [`IssuerError::InvalidGrant`] for another grant type, a missing
    ///   token or a missing or malformed subject
    /// - [`IssuerError::TokenInvalid`] when the presented token fails validation
    /// - [`IssuerError::Unauthorized`] when the caller lacks the role
    #[instrument(skip_all, fields(subject = ?request.impersonated_subject))]
    pub async fn impersonate_exchange(
        &self,
        request: &GrantRequest,
        caller: Option<&ClaimsPrincipal>,
    ) -> Result<AuthenticationTicket, IssuerError> {
        if !request.is_impersonation() {
            return Err(IssuerError::invalid_grant(
                "The specified grant type is not supported",
            ));
        }

        let caller = match caller {
            Some(caller) => caller.clone(),
            None => {
                let token = request
                    .access_token
                    .as_deref()
                    .ok_or_else(|| IssuerError::invalid_grant("The access token is missing"))?;
                self.validator.validate(token).await?
            }
        };

        if !(self.impersonation_check)(&caller) {
            return Err(IssuerError::unauthorized(
                "The caller is not allowed to impersonate",
            ));
        }

        let subject = request
            .impersonated_subject
            .as_deref()
            .ok_or_else(|| IssuerError::invalid_grant("The subject to impersonate is missing"))?;
        let user_id = Uuid::parse_str(subject)
            .map_err(|_| IssuerError::invalid_grant("The subject is not a valid user id"))?;

        let identity = self.utils.create_user_identity(user_id).await?;
        let scopes = self.utils.negotiate_scopes(request.scope.as_deref());
        let impersonator = caller.subject().unwrap_or_default().to_string();

        info!(impersonator = %impersonator, subject = %user_id, "Impersonation granted");

        Ok(self
            .utils
            .create_ticket(
                ClaimsPrincipal::new(identity),
                scopes,
                request.redirect_uri.clone(),
            )
            .with_property(IMPERSONATOR_PROPERTY, impersonator))
    }
}
