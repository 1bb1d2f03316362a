//! Token request handler pipeline.
//!
//! An ordered list of named handlers runs against every token request
//! before the exchange. Handlers either pass (leave the context alone) or
//! reject; the first rejection ends processing.
//!
//! Overriding a built-in rule means replacing the handler registered under
//! its name, see [`HandlerPipeline::replace`].

pub mod defaults;
pub mod validators;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::auth::{CLIENT_CREDENTIALS_GRANT, IMPERSONATION_GRANT};
use crate::identity::ClaimsPrincipal;

pub use defaults::{RequireClientId, ValidateGrantType};
pub use validators::{ClientIdValidator, ImpersonationTokenValidator};

/// Grant type check.
pub const VALIDATE_GRANT_TYPE: &str = "validate_grant_type";
/// Client id presence check.
pub const VALIDATE_CLIENT_ID: &str = "validate_client_id";
/// Impersonation authorization check.
pub const VALIDATE_IMPERSONATION_TOKEN: &str = "validate_impersonation_token";

/// An inbound token request, read-only to handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantRequest {
    /// `grant_type` parameter
    pub grant_type: String,
    /// `client_id` parameter
    pub client_id: Option<String>,
    /// `scope` parameter, space separated
    pub scope: Option<String>,
    /// Bearer token presented by an impersonating caller
    pub access_token: Option<String>,
    /// `subject` parameter: the principal to impersonate
    pub impersonated_subject: Option<String>,
    /// `redirect_uri` parameter
    pub redirect_uri: Option<String>,
}

impl GrantRequest {
    /// Request for `grant_type` with no other parameters.
    #[must_use]
    pub fn new(grant_type: impl Into<String>) -> Self {
        Self {
            grant_type: grant_type.into(),
            ..Self::default()
        }
    }

    /// Client credentials request.
    #[must_use]
    pub fn client_credentials(client_id: impl Into<String>) -> Self {
        Self::new(CLIENT_CREDENTIALS_GRANT).with_client_id(client_id)
    }

    /// Impersonation request presenting `access_token` for `subject`.
    #[must_use]
    pub fn impersonation(access_token: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            impersonated_subject: Some(subject.into()),
            ..Self::new(IMPERSONATION_GRANT)
        }
    }

    /// Set the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the requested scopes.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the redirect target.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Whether this is an impersonation request.
    #[must_use]
    pub fn is_impersonation(&self) -> bool {
        self.grant_type == IMPERSONATION_GRANT
    }

    /// Whether this is a client credentials request.
    #[must_use]
    pub fn is_client_credentials(&self) -> bool {
        self.grant_type == CLIENT_CREDENTIALS_GRANT
    }
}

/// OAuth2 error code of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// `invalid_request`
    InvalidRequest,
    /// `invalid_client`
    InvalidClient,
    /// `invalid_grant`
    InvalidGrant,
    /// `unauthorized_client`
    UnauthorizedClient,
    /// `unsupported_grant_type`
    UnsupportedGrantType,
    /// `access_denied`
    AccessDenied,
    /// `server_error`
    ServerError,
}

impl RejectionKind {
    /// Wire error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level refusal returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {description}")]
pub struct Rejection {
    /// Error code
    pub kind: RejectionKind,
    /// Human readable description
    pub description: String,
}

impl Rejection {
    /// Create a rejection.
    #[must_use]
    pub fn new(kind: RejectionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// Per-request state shared by the handlers.
#[derive(Debug)]
pub struct TokenRequestContext {
    request: GrantRequest,
    principal: Option<ClaimsPrincipal>,
    rejection: Option<Rejection>,
}

impl TokenRequestContext {
    /// Context for `request`.
    #[must_use]
    pub const fn new(request: GrantRequest) -> Self {
        Self {
            request,
            principal: None,
            rejection: None,
        }
    }

    /// The request being processed.
    #[must_use]
    pub const fn request(&self) -> &GrantRequest {
        &self.request
    }

    /// Reject the request. The first rejection is kept.
    pub fn reject(&mut self, kind: RejectionKind, description: impl Into<String>) {
        if self.rejection.is_none() {
            self.rejection = Some(Rejection::new(kind, description));
        }
    }

    /// Whether a handler rejected the request.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// The rejection, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    /// Attach the principal extracted from the request.
    pub fn set_principal(&mut self, principal: ClaimsPrincipal) {
        self.principal = Some(principal);
    }

    /// Principal attached by a handler.
    #[must_use]
    pub const fn principal(&self) -> Option<&ClaimsPrincipal> {
        self.principal.as_ref()
    }

    /// Take the request and attached principal out of the context.
    #[must_use]
    pub fn into_parts(self) -> (GrantRequest, Option<ClaimsPrincipal>) {
        (self.request, self.principal)
    }
}

/// A step in the pipeline.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Inspect the request; call [`TokenRequestContext::reject`] to refuse it.
    async fn handle(&self, context: &mut TokenRequestContext);
}

/// Pipeline registration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A handler with this name is already registered
    #[error("handler already registered: {0}")]
    Duplicate(String),

    /// No handler with this name is registered
    #[error("no handler named {0}")]
    Unknown(String),
}

struct NamedHandler {
    name: String,
    handler: Arc<dyn RequestHandler>,
}

/// Ordered, named request handlers.
#[derive(Default)]
pub struct HandlerPipeline {
    handlers: Vec<NamedHandler>,
}

impl HandlerPipeline {
    /// Empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline holding the built-in rules: supported grant types, then a
    /// client id requirement.
    #[must_use]
    pub fn with_defaults(supported_grant_types: &[&str]) -> Self {
        Self {
            handlers: vec![
                NamedHandler {
                    name: VALIDATE_GRANT_TYPE.to_string(),
                    handler: Arc::new(ValidateGrantType::new(supported_grant_types)),
                },
                NamedHandler {
                    name: VALIDATE_CLIENT_ID.to_string(),
                    handler: Arc::new(RequireClientId),
                },
            ],
        }
    }

    fn position(&self, name: &str) -> Result<usize, PipelineError> {
        self.handlers
            .iter()
            .position(|h| h.name == name)
            .ok_or_else(|| PipelineError::Unknown(name.to_string()))
    }

    fn named(&self, name: &str, handler: Arc<dyn RequestHandler>) -> Result<NamedHandler, PipelineError> {
        if self.handlers.iter().any(|h| h.name == name) {
            return Err(PipelineError::Duplicate(name.to_string()));
        }
        Ok(NamedHandler {
            name: name.to_string(),
            handler,
        })
    }

    /// Append a handler.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Duplicate`] if `name` is taken.
    pub fn add(&mut self, name: &str, handler: Arc<dyn RequestHandler>) -> Result<(), PipelineError> {
        let entry = self.named(name, handler)?;
        self.handlers.push(entry);
        Ok(())
    }

    /// Insert a handler right before `anchor`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Unknown`] if `anchor` is missing,
    /// [`PipelineError::Duplicate`] if `name` is taken.
    pub fn insert_before(
        &mut self,
        anchor: &str,
        name: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), PipelineError> {
        let index = self.position(anchor)?;
        let entry = self.named(name, handler)?;
        self.handlers.insert(index, entry);
        Ok(())
    }

    /// Insert a handler right after `anchor`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert_before`].
    pub fn insert_after(
        &mut self,
        anchor: &str,
        name: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), PipelineError> {
        let index = self.position(anchor)?;
        let entry = self.named(name, handler)?;
        self.handlers.insert(index + 1, entry);
        Ok(())
    }

    /// Override the handler registered under `name`, keeping its position.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Unknown`] if nothing is registered under `name`.
    pub fn replace(&mut self, name: &str, handler: Arc<dyn RequestHandler>) -> Result<(), PipelineError> {
        let index = self.position(name)?;
        self.handlers[index].handler = handler;
        Ok(())
    }

    /// Remove the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Unknown`] if nothing is registered under `name`.
    pub fn remove(&mut self, name: &str) -> Result<(), PipelineError> {
        let index = self.position(name)?;
        self.handlers.remove(index);
        Ok(())
    }

    /// Handler names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    /// Run every handler in order until one rejects.
    ///
    /// # Errors
    ///
    /// The rejection recorded by the handler that stopped processing.
    pub async fn process(&self, context: &mut TokenRequestContext) -> Result<(), Rejection> {
        for entry in &self.handlers {
            entry.handler.handle(context).await;
            if let Some(rejection) = context.rejection() {
                debug!(
                    handler = %entry.name,
                    error = %rejection.kind,
                    grant_type = %context.request().grant_type,
                    "Token request rejected"
                );
                return Err(rejection.clone());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HandlerPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerPipeline")
            .field("handlers", &self.names())
            .finish()
    }
}
