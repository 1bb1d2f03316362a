//! Shared test utilities for auth-platform Rust services.
//!
//! This crate provides:
//! - Proptest generators for token-request domain values
//! - Self-signed certificate bundles for signing-key tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::{CertificateBundle, Curve};
pub use generators::*;
