//! Token Issuer library.
//!
//! Issues OAuth2/OIDC tokens for the client credentials and impersonation
//! grants and keeps the certificate-backed signing keys rotated without
//! interrupting issuance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod certificates;
pub mod config;
pub mod error;
pub mod identity;
pub mod jwks;
pub mod jwt;
pub mod metrics;
pub mod pipeline;
pub mod server;
pub mod stores;

// Re-exports for convenience
pub use certificates::{CertificateManager, CertificateUpdater};
pub use config::Config;
pub use error::IssuerError;
pub use pipeline::{GrantRequest, Rejection, RejectionKind};
pub use server::{TokenResponse, TokenServer};
