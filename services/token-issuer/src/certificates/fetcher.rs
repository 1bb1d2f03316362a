//! Certificate fetcher.
//!
//! Retrieves a certificate bundle from the object store by content hash and
//! turns it into a [`SigningCredential`]. Every failure resolves to `None`
//! so a broken inactive certificate never blocks rotation of the active one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
};
use rust_common::PlatformError;
use rustls_pemfile::Item;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use super::credential::{EcCurve, SigningCredential};
use crate::stores::{cancellable, ObjectStore};

/// Reasons a certificate bundle is unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificateParseError {
    /// The PEM document could not be read
    #[error("malformed PEM: {0}")]
    Pem(String),

    /// No certificate section present
    #[error("no certificate in bundle")]
    NoCertificate,

    /// No private key section present
    #[error("no private key in bundle")]
    NoPrivateKey,

    /// The certificate DER could not be parsed
    #[error("malformed certificate: {0}")]
    X509(String),

    /// The private key is not a PKCS#8 P-256 or P-384 key
    #[error("unsupported private key: {0}")]
    UnsupportedKey(&'static str),

    /// The private key does not belong to the certificate
    #[error("private key does not match certificate public key")]
    KeyMismatch,

    /// The certificate validity window does not include now
    #[error("certificate outside its validity period")]
    OutsideValidity,
}

/// Loads signing credentials from the object store.
#[derive(Clone)]
pub struct CertificateFetcher {
    store: Arc<dyn ObjectStore>,
}

impl CertificateFetcher {
    /// Create a fetcher reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch and parse the certificate stored under `hash` in `bucket`.
    ///
    /// The returned credential's key id is `hash`.
    #[instrument(skip(self, cancel), fields(bucket = %bucket, hash = %hash))]
    pub async fn fetch(
        &self,
        bucket: &str,
        hash: &str,
        cancel: &CancellationToken,
    ) -> Option<SigningCredential> {
        let bytes = match cancellable(cancel, self.store.get_object(bucket, hash)).await {
            Ok(bytes) => bytes,
            Err(PlatformError::Cancelled) => {
                debug!("Certificate fetch cancelled");
                return None;
            }
            Err(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "Certificate fetch failed");
                return None;
            }
        };

        match parse_certificate_bundle(hash, &bytes) {
            Ok(credential) => {
                debug!(algorithm = ?credential.algorithm(), "Certificate loaded");
                Some(credential)
            }
            Err(err) => {
                warn!(error = %err, "Certificate rejected");
                None
            }
        }
    }
}

/// Parse a PEM bundle (certificate + PKCS#8 private key) into a credential
/// identified by `key_id`.
///
/// # Errors
///
/// Returns the first reason the bundle cannot be used for signing.
pub fn parse_certificate_bundle(
    key_id: &str,
    bytes: &[u8],
) -> Result<SigningCredential, CertificateParseError> {
    let mut cert_der = None;
    let mut key_der: Option<Zeroizing<Vec<u8>>> = None;

    for item in rustls_pemfile::read_all(&mut Cursor::new(bytes)) {
        match item.map_err(|e| CertificateParseError::Pem(e.to_string()))? {
            Item::X509Certificate(der) => {
                cert_der.get_or_insert(der);
            }
            Item::Pkcs8Key(key) => {
                key_der.get_or_insert_with(|| Zeroizing::new(key.secret_pkcs8_der().to_vec()));
            }
            Item::Sec1Key(_) | Item::Pkcs1Key(_) => {
                return Err(CertificateParseError::UnsupportedKey(
                    "only PKCS#8 encoded keys are accepted",
                ));
            }
            _ => {}
        }
    }

    let cert_der = cert_der.ok_or(CertificateParseError::NoCertificate)?;
    let key_der = key_der.ok_or(CertificateParseError::NoPrivateKey)?;

    let (_, cert) = x509_parser::parse_x509_certificate(cert_der.as_ref())
        .map_err(|e| CertificateParseError::X509(e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    let not_before = cert.validity().not_before.timestamp();
    let not_after = cert.validity().not_after.timestamp();
    if now < not_before || now > not_after {
        return Err(CertificateParseError::OutsideValidity);
    }

    let (curve, key_point) = load_key_pair(&key_der)?;
    let cert_point: &[u8] = &cert.public_key().subject_public_key.data;
    if key_point.as_slice() != cert_point {
        return Err(CertificateParseError::KeyMismatch);
    }

    let (x, y) = split_point(curve, cert_point)?;
    let decoding_key = DecodingKey::from_ec_components(&x, &y)
        .map_err(|_| CertificateParseError::UnsupportedKey("invalid public point"))?;
    let encoding_key = EncodingKey::from_ec_der(&key_der);
    let thumbprint = URL_SAFE_NO_PAD.encode(Sha256::digest(cert_der.as_ref()));

    Ok(SigningCredential::new(
        key_id.to_string(),
        curve,
        encoding_key,
        decoding_key,
        x,
        y,
        thumbprint,
        not_after,
    ))
}

/// Load the PKCS#8 key with ring and return its curve and public point.
fn load_key_pair(pkcs8: &[u8]) -> Result<(EcCurve, Vec<u8>), CertificateParseError> {
    let rng = SystemRandom::new();
    let candidates = [
        (EcCurve::P256, &ECDSA_P256_SHA256_FIXED_SIGNING),
        (EcCurve::P384, &ECDSA_P384_SHA384_FIXED_SIGNING),
    ];

    for (curve, algorithm) in candidates {
        if let Ok(pair) = EcdsaKeyPair::from_pkcs8(algorithm, pkcs8, &rng) {
            return Ok((curve, pair.public_key().as_ref().to_vec()));
        }
    }

    Err(CertificateParseError::UnsupportedKey(
        "expected an EC P-256 or P-384 key",
    ))
}

/// Split an uncompressed SEC1 point into base64url `x` and `y`.
fn split_point(curve: EcCurve, point: &[u8]) -> Result<(String, String), CertificateParseError> {
    let len = curve.coordinate_len();
    if point.len() != 1 + 2 * len || point[0] != 0x04 {
        return Err(CertificateParseError::UnsupportedKey(
            "public point is not uncompressed",
        ));
    }
    Ok((
        URL_SAFE_NO_PAD.encode(&point[1..=len]),
        URL_SAFE_NO_PAD.encode(&point[1 + len..]),
    ))
}
