//! Certificate fixtures.
//!
//! Bundles mirror what the certificate bucket holds: one PEM document with
//! the X.509 certificate followed by its PKCS#8 private key.

use rcgen::{
    date_time_ymd, CertificateParams, KeyPair, SignatureAlgorithm, PKCS_ECDSA_P256_SHA256,
    PKCS_ECDSA_P384_SHA384,
};

/// Elliptic curve of a generated signing certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256 (ES256)
    P256,
    /// NIST P-384 (ES384)
    P384,
}

impl Curve {
    fn algorithm(self) -> &'static SignatureAlgorithm {
        match self {
            Self::P256 => &PKCS_ECDSA_P256_SHA256,
            Self::P384 => &PKCS_ECDSA_P384_SHA384,
        }
    }
}

/// A generated certificate with its private key.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    /// PEM encoded certificate
    pub certificate_pem: String,
    /// PEM encoded PKCS#8 private key
    pub private_key_pem: String,
}

impl CertificateBundle {
    /// Certificate and key concatenated, as stored in the bucket.
    #[must_use]
    pub fn pem(&self) -> String {
        format!("{}{}", self.certificate_pem, self.private_key_pem)
    }

    /// The bundle as raw object bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pem().into_bytes()
    }

    /// Only the certificate, without any private key.
    #[must_use]
    pub fn certificate_only(&self) -> Vec<u8> {
        self.certificate_pem.clone().into_bytes()
    }
}

fn params() -> CertificateParams {
    CertificateParams::new(vec!["token-issuer.test".to_string()])
        .expect("static subject alt names are valid")
}

/// Generate a currently valid self-signed signing certificate.
#[must_use]
pub fn certificate_bundle(curve: Curve) -> CertificateBundle {
    let key_pair = KeyPair::generate_for(curve.algorithm()).expect("key generation");
    let cert = params().self_signed(&key_pair).expect("self-signed certificate");
    CertificateBundle {
        certificate_pem: cert.pem(),
        private_key_pem: key_pair.serialize_pem(),
    }
}

/// Generate a certificate whose validity window ended in the past.
#[must_use]
pub fn expired_certificate_bundle() -> CertificateBundle {
    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key generation");
    let mut params = params();
    params.not_before = date_time_ymd(2000, 1, 1);
    params.not_after = date_time_ymd(2001, 1, 1);
    let cert = params.self_signed(&key_pair).expect("self-signed certificate");
    CertificateBundle {
        certificate_pem: cert.pem(),
        private_key_pem: key_pair.serialize_pem(),
    }
}

/// Generate a bundle whose private key does not belong to the certificate.
#[must_use]
pub fn mismatched_certificate_bundle() -> CertificateBundle {
    let signing = certificate_bundle(Curve::P256);
    let other = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key generation");
    CertificateBundle {
        certificate_pem: signing.certificate_pem,
        private_key_pem: other.serialize_pem(),
    }
}

/// The JSON document stored in the certificate parameter.
#[must_use]
pub fn certificate_configuration_json(
    bucket: &str,
    active_hash: &str,
    inactive_hash: Option<&str>,
) -> String {
    serde_json::json!({
        "bucket": bucket,
        "activeHash": active_hash,
        "inactiveHash": inactive_hash,
    })
    .to_string()
}
