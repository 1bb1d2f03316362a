use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::certificates::{CertificateManager, SigningCredentialSet};

/// Public EC key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `EC`
    pub kty: String,
    /// Key id, the certificate hash
    pub kid: String,
    /// Intended use, always `sig`
    #[serde(rename = "use")]
    pub key_use: String,
    /// JWS algorithm
    pub alg: String,
    /// Curve name
    pub crv: String,
    /// Base64url x coordinate
    pub x: String,
    /// Base64url y coordinate
    pub y: String,
    /// Base64url SHA-256 thumbprint of the certificate
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// Keys, active first
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Public keys of every validation credential in `set`.
    #[must_use]
    pub fn from_credentials(set: &SigningCredentialSet) -> Self {
        Self {
            keys: set
                .validation_credentials()
                .iter()
                .map(|c| c.to_jwk())
                .collect(),
        }
    }

    /// Look up a key by id.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Serialize as the JSON document served to resource servers.
    ///
    /// # Errors
    ///
    /// Returns a serialization error (not expected for well-formed keys).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Serves the key set that matches the manager's current credentials.
#[derive(Clone)]
pub struct JwksPublisher {
    manager: Arc<CertificateManager>,
}

impl JwksPublisher {
    /// Create a publisher over `manager`.
    #[must_use]
    pub fn new(manager: Arc<CertificateManager>) -> Self {
        Self { manager }
    }

    /// The current key set.
    #[must_use]
    pub fn get_jwks(&self) -> Jwks {
        self.manager.jwks()
    }

    /// Key id of the active signing credential.
    #[must_use]
    pub fn current_key_id(&self) -> Option<String> {
        self.manager.snapshot().active().map(|c| c.key_id().to_string())
    }
}
