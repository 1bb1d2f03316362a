use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::identity::claims::decode_roles;

/// Claim set of an issued access or identity token.
///
/// Registered claims are always present; the identity claims are omitted
/// from the payload when unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub nbf: Option<i64>,
    pub jti: String,

    /// Granted scopes, space separated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Roles encoded as a JSON array string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Claims issued now and expiring `lifetime_secs` later, with a fresh `jti`.
    #[must_use]
    pub fn issued_now(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: Vec<String>,
        lifetime_secs: i64,
    ) -> Self {
        let issued_at = chrono::Utc::now().timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: audience,
            exp: issued_at + lifetime_secs,
            iat: issued_at,
            nbf: Some(issued_at),
            jti: uuid::Uuid::new_v4().to_string(),
            scope: None,
            name: None,
            role: None,
            client_id: None,
            custom: HashMap::new(),
        }
    }

    /// Store `scopes` as one space separated claim, dropping it when empty.
    #[must_use]
    pub fn with_scopes(mut self, scopes: &[String]) -> Self {
        self.scope = (!scopes.is_empty()).then(|| scopes.join(" "));
        self
    }

    /// Granted scopes as a list.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Roles carried by the `role` claim, decoded like
    /// [`ClaimsIdentity::roles`](crate::identity::ClaimsIdentity::roles).
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.role.as_deref().map(decode_roles).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_now_window() {
        let claims = Claims::issued_now("issuer", "client-123", vec!["api".to_string()], 3600);

        assert_eq!(claims.iss, "issuer");
        assert_eq!(claims.sub, "client-123");
        assert_eq!(claims.nbf, Some(claims.iat));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(uuid::Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_each_token_gets_its_own_jti() {
        let a = Claims::issued_now("i", "s", vec![], 60);
        let b = Claims::issued_now("i", "s", vec![], 60);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_scope_claim_is_space_separated() {
        let claims = Claims::issued_now("i", "s", vec![], 60)
            .with_scopes(&["openid".to_string(), "api".to_string()]);
        assert_eq!(claims.scope.as_deref(), Some("openid api"));
        assert_eq!(claims.scopes(), vec!["openid", "api"]);

        let empty = Claims::issued_now("i", "s", vec![], 60).with_scopes(&[]);
        assert_eq!(empty.scope, None);
        assert!(empty.scopes().is_empty());
    }

    #[test]
    fn test_role_claim_decodes_array_or_single_value() {
        let mut claims = Claims::issued_now("i", "s", vec![], 60);
        assert!(claims.roles().is_empty());

        claims.role = Some(r#"["Admin","Reader"]"#.to_string());
        assert_eq!(claims.roles(), vec!["Admin", "Reader"]);

        claims.role = Some("Admin".to_string());
        assert_eq!(claims.roles(), vec!["Admin"]);
    }

    #[test]
    fn test_optional_claims_omitted() {
        let mut claims = Claims::issued_now("i", "s", vec!["a".to_string()], 60);
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("role").is_none());
        assert!(value.get("name").is_none());
        assert!(value.get("scope").is_none());

        claims.role = Some(r#"["Admin"]"#.to_string());
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["role"], r#"["Admin"]"#);
    }
}
