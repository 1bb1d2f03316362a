//! Authentication tickets handed to the token minting step.

use std::collections::BTreeMap;

use super::claims::ClaimsPrincipal;

/// Everything needed to mint tokens for one request.
///
/// Request scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationTicket {
    principal: ClaimsPrincipal,
    scopes: Vec<String>,
    resources: Vec<String>,
    redirect_uri: Option<String>,
    authentication_scheme: String,
    properties: BTreeMap<String, String>,
}

impl AuthenticationTicket {
    /// Ticket for `principal`, with no scopes or resources yet.
    #[must_use]
    pub fn new(principal: ClaimsPrincipal, authentication_scheme: impl Into<String>) -> Self {
        Self {
            principal,
            scopes: Vec::new(),
            resources: Vec::new(),
            redirect_uri: None,
            authentication_scheme: authentication_scheme.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the granted scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the resource indicators (token audiences).
    #[must_use]
    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.resources = resources;
        self
    }

    /// Set the redirect target.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: Option<String>) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    /// Attach a free-form property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The subject principal.
    #[must_use]
    pub const fn principal(&self) -> &ClaimsPrincipal {
        &self.principal
    }

    /// Granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether `scope` was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Resource indicators.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Redirect target, if any.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Authentication scheme tag.
    #[must_use]
    pub fn authentication_scheme(&self) -> &str {
        &self.authentication_scheme
    }

    /// Property lookup.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
