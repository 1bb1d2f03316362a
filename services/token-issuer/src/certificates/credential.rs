//! Signing credentials and the immutable set the manager publishes.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use std::fmt;
use std::sync::Arc;

use crate::jwks::Jwk;

/// Elliptic curve of a signing credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256
    P256,
    /// NIST P-384
    P384,
}

impl EcCurve {
    /// JOSE curve name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        }
    }

    /// JWS algorithm signing with this curve.
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
        }
    }

    /// Byte length of one affine coordinate.
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }
}

/// A key pair able to sign and verify tokens, identified by the hash of the
/// certificate it was loaded from.
///
/// Immutable once constructed.
#[derive(Clone)]
pub struct SigningCredential {
    key_id: String,
    curve: EcCurve,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    x: String,
    y: String,
    thumbprint: String,
    not_after: i64,
}

impl SigningCredential {
    /// Assemble a credential from already validated parts.
    ///
    /// `x` and `y` are the base64url encoded public point coordinates and
    /// `thumbprint` the base64url SHA-256 digest of the certificate DER.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key_id: String,
        curve: EcCurve,
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
        x: String,
        y: String,
        thumbprint: String,
        not_after: i64,
    ) -> Self {
        Self {
            key_id,
            curve,
            encoding_key,
            decoding_key,
            x,
            y,
            thumbprint,
            not_after,
        }
    }

    /// Key id, equal to the source certificate hash.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// JWS algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.curve.algorithm()
    }

    /// Curve of the key pair.
    #[must_use]
    pub const fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Private half, for signing.
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public half, for validation.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Expiry of the source certificate (Unix seconds).
    #[must_use]
    pub const fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Public JSON Web Key for this credential.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "EC".to_string(),
            kid: self.key_id.clone(),
            key_use: "sig".to_string(),
            alg: format!("{:?}", self.algorithm()),
            crv: self.curve.as_str().to_string(),
            x: self.x.clone(),
            y: self.y.clone(),
            x5t_s256: Some(self.thumbprint.clone()),
        }
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm())
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

/// The credentials in effect at one point in time.
///
/// The first entry is the active credential and signs every new token; all
/// entries validate incoming tokens. Snapshots are never mutated, the
/// manager swaps whole snapshots.
#[derive(Debug, Clone, Default)]
pub struct SigningCredentialSet {
    credentials: Vec<Arc<SigningCredential>>,
    generation: u64,
}

impl SigningCredentialSet {
    /// Build a set whose first credential is the active one.
    #[must_use]
    pub fn new(credentials: Vec<Arc<SigningCredential>>, generation: u64) -> Self {
        Self {
            credentials,
            generation,
        }
    }

    /// The credential used for signing.
    #[must_use]
    pub fn active(&self) -> Option<&Arc<SigningCredential>> {
        self.credentials.first()
    }

    /// Every credential accepted for validation, active first.
    #[must_use]
    pub fn validation_credentials(&self) -> &[Arc<SigningCredential>] {
        &self.credentials
    }

    /// Look up a validation credential by key id.
    #[must_use]
    pub fn find(&self, key_id: &str) -> Option<&Arc<SigningCredential>> {
        self.credentials.iter().find(|c| c.key_id() == key_id)
    }

    /// Key ids of the validation credentials, active first.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.credentials.iter().map(|c| c.key_id()).collect()
    }

    /// Number of successful replacements before this snapshot.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// No credential installed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Number of credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }
}
