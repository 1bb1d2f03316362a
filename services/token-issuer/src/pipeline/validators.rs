//! Custom admission rules layered into the pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{RejectionKind, RequestHandler, TokenRequestContext};
use crate::auth::ImpersonationCheck;
use crate::jwt::AccessTokenValidator;

/// Replaces [`super::RequireClientId`]: a client id is required unless the
/// request is an impersonation or anonymous clients are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIdValidator {
    accept_anonymous_clients: bool,
}

impl ClientIdValidator {
    /// Create the validator.
    #[must_use]
    pub const fn new(accept_anonymous_clients: bool) -> Self {
        Self {
            accept_anonymous_clients,
        }
    }
}

#[async_trait]
impl RequestHandler for ClientIdValidator {
    async fn handle(&self, context: &mut TokenRequestContext) {
        let request = context.request();
        let has_client_id = request.client_id.as_deref().is_some_and(|id| !id.is_empty());

        if has_client_id || request.is_impersonation() || self.accept_anonymous_clients {
            return;
        }

        context.reject(
            RejectionKind::InvalidClient,
            "The mandatory 'client_id' parameter is missing",
        );
    }
}

/// For impersonation requests, authenticates the presented access token
/// and requires its principal to pass the impersonation check. The
/// principal is attached to the context on success.
#[derive(Clone)]
pub struct ImpersonationTokenValidator {
    validator: Arc<dyn AccessTokenValidator>,
    check: ImpersonationCheck,
}

impl ImpersonationTokenValidator {
    /// Create the validator. `check` should be the one the grant handler
    /// applies so both stages agree.
    #[must_use]
    pub fn new(validator: Arc<dyn AccessTokenValidator>, check: ImpersonationCheck) -> Self {
        Self { validator, check }
    }
}

#[async_trait]
impl RequestHandler for ImpersonationTokenValidator {
    async fn handle(&self, context: &mut TokenRequestContext) {
        if !context.request().is_impersonation() {
            return;
        }

        let Some(token) = context.request().access_token.clone() else {
            context.reject(
                RejectionKind::InvalidRequest,
                "The access token is missing",
            );
            return;
        };

        let principal = match self.validator.validate(&token).await {
            Ok(principal) => principal,
            Err(err) => {
                debug!(error = %err, "Impersonation token rejected");
                context.reject(RejectionKind::InvalidGrant, "The access token is invalid");
                return;
            }
        };

        if !(self.check)(&principal) {
            info!(
                subject = principal.subject().unwrap_or_default(),
                "Impersonation attempted without impersonator role"
            );
            context.reject(
                RejectionKind::UnauthorizedClient,
                "The caller is not allowed to impersonate",
            );
            return;
        }

        context.set_principal(principal);
    }
}
