//! Built-in request rules.

use async_trait::async_trait;

use super::{RejectionKind, RequestHandler, TokenRequestContext};

/// Rejects grant types the server does not serve.
#[derive(Debug, Clone)]
pub struct ValidateGrantType {
    supported: Vec<String>,
}

impl ValidateGrantType {
    /// Accept only `supported` grant types.
    #[must_use]
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl RequestHandler for ValidateGrantType {
    async fn handle(&self, context: &mut TokenRequestContext) {
        let grant_type = context.request().grant_type.as_str();
        if grant_type.is_empty() {
            context.reject(
                RejectionKind::InvalidRequest,
                "The mandatory 'grant_type' parameter is missing",
            );
        } else if !self.supported.iter().any(|g| g == grant_type) {
            context.reject(
                RejectionKind::UnsupportedGrantType,
                "The specified 'grant_type' is not supported",
            );
        }
    }
}

/// Requires a client id on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireClientId;

#[async_trait]
impl RequestHandler for RequireClientId {
    async fn handle(&self, context: &mut TokenRequestContext) {
        if context.request().client_id.as_deref().map_or(true, str::is_empty) {
            context.reject(
                RejectionKind::InvalidClient,
                "The mandatory 'client_id' parameter is missing",
            );
        }
    }
}
