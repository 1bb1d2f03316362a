use std::collections::HashMap;

use crate::error::IssuerError;
use crate::identity::claims::{CLIENT_ID, NAME, ROLE, SUBJECT};
use crate::identity::{ClaimsPrincipal, Destination};
use crate::jwt::claims::Claims;

const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Assembles the claim set of one token from a principal and the grant.
pub struct JwtBuilder {
    issuer: String,
    audience: Vec<String>,
    lifetime_secs: i64,
    scopes: Vec<String>,
    subject: Option<String>,
    name: Option<String>,
    role: Option<String>,
    client_id: Option<String>,
    extra: HashMap<String, serde_json::Value>,
}

impl JwtBuilder {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: Vec::new(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            scopes: Vec::new(),
            subject: None,
            name: None,
            role: None,
            client_id: None,
            extra: HashMap::new(),
        }
    }

    /// Copy the claims of `principal` destined for `destination`.
    ///
    /// Claim types without a dedicated field land in the flattened extras.
    #[must_use]
    pub fn principal(mut self, principal: &ClaimsPrincipal, destination: Destination) -> Self {
        for claim in principal.claims().filter(|c| c.has_destination(destination)) {
            let value = claim.value().to_string();
            match claim.claim_type() {
                SUBJECT => self.subject = Some(value),
                NAME => self.name = Some(value),
                ROLE => self.role = Some(value),
                CLIENT_ID => self.client_id = Some(value),
                other => {
                    self.extra
                        .insert(other.to_string(), serde_json::Value::String(value));
                }
            }
        }
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub const fn lifetime_secs(mut self, secs: i64) -> Self {
        self.lifetime_secs = secs;
        self
    }

    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Stamp the requesting client, replacing any client id from the principal.
    #[must_use]
    pub fn client_id(mut self, client_id: Option<String>) -> Self {
        if let Some(client_id) = client_id {
            self.client_id = Some(client_id);
        }
        self
    }

    /// # Errors
    ///
    /// [`IssuerError::JwtEncoding`] when neither the principal nor the caller
    /// supplied a subject.
    pub fn build(self) -> Result<Claims, IssuerError> {
        let Some(subject) = self.subject else {
            return Err(IssuerError::JwtEncoding("Subject is required".to_string()));
        };

        let mut claims = Claims::issued_now(self.issuer, subject, self.audience, self.lifetime_secs)
            .with_scopes(&self.scopes);
        claims.name = self.name;
        claims.role = self.role;
        claims.client_id = self.client_id;
        claims.custom = self.extra;
        Ok(claims)
    }
}
