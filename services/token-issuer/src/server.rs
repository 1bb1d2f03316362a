//! Token endpoint logic.
//!
//! [`TokenServer::exchange`] runs the handler pipeline, dispatches to the
//! grant handler and signs the resulting ticket with the active credential.
//! Transport is left to the host, and so is client authentication: a client
//! id reaching `exchange` is trusted as-is.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::auth::{
    is_impersonator, AuthService, AuthUtils, ImpersonationCheck, CLIENT_CREDENTIALS_GRANT,
    IMPERSONATION_GRANT, OPENID_SCOPE, SUPPORTED_GRANT_TYPES,
};
use crate::certificates::CertificateManager;
use crate::config::Config;
use crate::error::IssuerError;
use crate::identity::{AuthenticationTicket, Destination, PrincipalDirectory};
use crate::jwt::{AccessTokenValidator, JwtBuilder, JwtSerializer, TokenValidator};
use crate::metrics;
use crate::pipeline::{
    ClientIdValidator, GrantRequest, HandlerPipeline, ImpersonationTokenValidator, PipelineError,
    Rejection, TokenRequestContext, VALIDATE_CLIENT_ID, VALIDATE_IMPERSONATION_TOKEN,
};

/// Successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Granted scopes, space separated
    pub scope: String,
    /// Identity token, issued when `openid` is granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Register the custom admission rules on a pipeline holding the defaults.
///
/// The client id rule is overridden by name and the impersonation token
/// check runs right after it, gated by `check`.
///
/// # Errors
///
/// [`PipelineError::Unknown`] if the default client id rule is missing.
pub fn register_validators(
    pipeline: &mut HandlerPipeline,
    accept_anonymous_clients: bool,
    validator: Arc<dyn AccessTokenValidator>,
    check: ImpersonationCheck,
) -> Result<(), PipelineError> {
    pipeline.replace(
        VALIDATE_CLIENT_ID,
        Arc::new(ClientIdValidator::new(accept_anonymous_clients)),
    )?;
    pipeline.insert_after(
        VALIDATE_CLIENT_ID,
        VALIDATE_IMPERSONATION_TOKEN,
        Arc::new(ImpersonationTokenValidator::new(validator, check)),
    )
}

/// Issues tokens for the supported grants.
///
/// Not a complete endpoint: the host authenticates the client before
/// calling [`Self::exchange`].
pub struct TokenServer {
    pipeline: HandlerPipeline,
    auth: AuthService,
    manager: Arc<CertificateManager>,
    validator: Arc<TokenValidator>,
    issuer: String,
    audience: String,
    access_token_ttl: u64,
}

impl TokenServer {
    /// Wire the server from configuration, validating presented tokens
    /// against the manager's credentials and requiring the impersonator role.
    ///
    /// # Errors
    ///
    /// [`IssuerError::Config`] if the pipeline cannot be assembled.
    pub fn new(
        config: &Config,
        manager: Arc<CertificateManager>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Result<Self, IssuerError> {
        let validator = Arc::new(issued_token_validator(config, &manager));
        Self::assemble(
            config,
            manager,
            directory,
            validator.clone(),
            validator,
            Arc::new(is_impersonator),
        )
    }

    /// Wire the server with a custom access token validator and impersonation
    /// check. The pipeline and the grant handler share both.
    ///
    /// # Errors
    ///
    /// [`IssuerError::Config`] if the pipeline cannot be assembled.
    pub fn with_access_validator(
        config: &Config,
        manager: Arc<CertificateManager>,
        directory: Arc<dyn PrincipalDirectory>,
        access_validator: Arc<dyn AccessTokenValidator>,
        check: ImpersonationCheck,
    ) -> Result<Self, IssuerError> {
        let validator = Arc::new(issued_token_validator(config, &manager));
        Self::assemble(config, manager, directory, validator, access_validator, check)
    }

    fn assemble(
        config: &Config,
        manager: Arc<CertificateManager>,
        directory: Arc<dyn PrincipalDirectory>,
        validator: Arc<TokenValidator>,
        access_validator: Arc<dyn AccessTokenValidator>,
        check: ImpersonationCheck,
    ) -> Result<Self, IssuerError> {
        let mut pipeline = HandlerPipeline::with_defaults(SUPPORTED_GRANT_TYPES);
        register_validators(
            &mut pipeline,
            config.accept_anonymous_clients,
            access_validator.clone(),
            check.clone(),
        )
        .map_err(|e| IssuerError::config(e.to_string()))?;

        let utils = Arc::new(AuthUtils::new(config, directory, manager.clone()));
        let auth = AuthService::new(utils, access_validator).with_impersonation_check(check);

        Ok(Self {
            pipeline,
            auth,
            manager,
            validator,
            issuer: config.issuer_str().to_string(),
            audience: config.audience.clone(),
            access_token_ttl: config.access_token_ttl.as_secs(),
        })
    }

    /// The request pipeline, for inspection.
    #[must_use]
    pub const fn pipeline(&self) -> &HandlerPipeline {
        &self.pipeline
    }

    /// The request pipeline, for adding or overriding handlers.
    pub fn pipeline_mut(&mut self) -> &mut HandlerPipeline {
        &mut self.pipeline
    }

    /// Grant handlers.
    #[must_use]
    pub const fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Validator for tokens issued by this server.
    #[must_use]
    pub fn validator(&self) -> Arc<TokenValidator> {
        self.validator.clone()
    }

    /// Handle a token request.
    ///
    /// # Errors
    ///
    /// A [`Rejection`] for refused requests; server faults surface as
    /// `server_error` without details.
    #[instrument(skip_all, fields(grant_type = %request.grant_type))]
    pub async fn exchange(&self, request: GrantRequest) -> Result<TokenResponse, Rejection> {
        let started = Instant::now();
        let grant_type = request.grant_type.clone();

        let result = self.process(request).await;
        metrics::record_exchange_latency(&grant_type, started.elapsed().as_secs_f64());

        if let Err(rejection) = &result {
            metrics::record_rejection(rejection.kind.as_str());
        }
        result
    }

    async fn process(&self, request: GrantRequest) -> Result<TokenResponse, Rejection> {
        let mut context = TokenRequestContext::new(request);
        self.pipeline.process(&mut context).await?;
        let (request, caller) = context.into_parts();

        let ticket = match request.grant_type.as_str() {
            CLIENT_CREDENTIALS_GRANT => self.auth.client_exchange(&request).await,
            IMPERSONATION_GRANT => {
                self.auth
                    .impersonate_exchange(&request, caller.as_ref())
                    .await
            }
            _ => Err(IssuerError::invalid_grant(
                "The specified grant type is not supported",
            )),
        }
        .map_err(|err| reject(&err))?;

        self.mint(&request, &ticket).map_err(|err| reject(&err))
    }

    fn mint(
        &self,
        request: &GrantRequest,
        ticket: &AuthenticationTicket,
    ) -> Result<TokenResponse, IssuerError> {
        // one snapshot for the whole response
        let snapshot = self.manager.snapshot();
        let credential = snapshot.active().ok_or(IssuerError::NoSigningCredential)?;
        let ttl = i64::try_from(self.access_token_ttl).unwrap_or(i64::MAX);
        let algorithm = format!("{:?}", credential.algorithm());

        let access_claims = JwtBuilder::new(self.issuer.clone())
            .principal(ticket.principal(), Destination::AccessToken)
            .audience(ticket.resources().to_vec())
            .scopes(ticket.scopes().to_vec())
            .client_id(request.client_id.clone())
            .lifetime_secs(ttl)
            .build()?;
        let access_token = JwtSerializer::serialize(&access_claims, credential)?;
        metrics::record_token_issued(&request.grant_type, "access_token", &algorithm);

        let id_token = if ticket.has_scope(OPENID_SCOPE) {
            let audience = request
                .client_id
                .clone()
                .unwrap_or_else(|| self.audience.clone());
            let identity_claims = JwtBuilder::new(self.issuer.clone())
                .principal(ticket.principal(), Destination::IdentityToken)
                .audience(vec![audience])
                .lifetime_secs(ttl)
                .build()?;
            let token = JwtSerializer::serialize(&identity_claims, credential)?;
            metrics::record_token_issued(&request.grant_type, "id_token", &algorithm);
            Some(token)
        } else {
            None
        };

        info!(
            kid = %credential.key_id(),
            subject = %access_claims.sub,
            "Token issued"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl,
            scope: ticket.scopes().join(" "),
            id_token,
        })
    }
}

fn issued_token_validator(config: &Config, manager: &Arc<CertificateManager>) -> TokenValidator {
    TokenValidator::new(manager.clone(), config.issuer_str(), config.audience.clone())
}

fn reject(err: &IssuerError) -> Rejection {
    if err.is_rejection() {
        debug!(error = %err, code = err.code(), "Token exchange refused");
    } else {
        warn!(error = %err, code = err.code(), "Token exchange failed");
    }
    err.to_rejection()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryDirectory;
    use crate::pipeline::{RejectionKind, VALIDATE_GRANT_TYPE};

    fn server() -> TokenServer {
        TokenServer::new(
            &Config::default(),
            Arc::new(CertificateManager::new()),
            Arc::new(MemoryDirectory::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_layout() {
        assert_eq!(
            server().pipeline().names(),
            vec![
                VALIDATE_GRANT_TYPE,
                VALIDATE_CLIENT_ID,
                VALIDATE_IMPERSONATION_TOKEN
            ]
        );
    }

    #[test]
    fn test_register_validators_requires_default_rule() {
        let mut pipeline = HandlerPipeline::new();
        let validator = server().validator();
        let check: ImpersonationCheck = Arc::new(is_impersonator);
        assert!(register_validators(&mut pipeline, false, validator, check).is_err());
    }

    #[tokio::test]
    async fn test_unsupported_grant_rejected() {
        let rejection = server()
            .exchange(GrantRequest::new("password").with_client_id("c"))
            .await
            .unwrap_err();
        assert_eq!(rejection.kind, RejectionKind::UnsupportedGrantType);
    }

    #[tokio::test]
    async fn test_no_credential_is_server_error() {
        let rejection = server()
            .exchange(GrantRequest::client_credentials(uuid::Uuid::new_v4().to_string()))
            .await
            .unwrap_err();
        assert_eq!(rejection.kind, RejectionKind::ServerError);
    }
}
