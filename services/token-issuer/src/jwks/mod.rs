//! JSON Web Key Set publishing for the signing credentials.

pub mod publisher;

pub use publisher::{Jwk, Jwks, JwksPublisher};
