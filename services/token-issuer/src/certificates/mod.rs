//! Signing-key lifecycle.
//!
//! Certificates are produced elsewhere and published to an object store;
//! a parameter names the active and inactive ones. The updater turns that
//! into the credential set held by [`CertificateManager`].

pub mod config_source;
pub mod credential;
pub mod fetcher;
pub mod manager;
pub mod updater;

pub use config_source::{CertificateConfiguration, CertificateConfigurationSource};
pub use credential::{EcCurve, SigningCredential, SigningCredentialSet};
pub use fetcher::{parse_certificate_bundle, CertificateFetcher, CertificateParseError};
pub use manager::CertificateManager;
pub use updater::CertificateUpdater;
