//! Token claims, encoding and validation.

pub mod builder;
pub mod claims;
pub mod serializer;
pub mod validator;

pub use builder::JwtBuilder;
pub use claims::Claims;
pub use serializer::JwtSerializer;
pub use validator::{principal_from_claims, AccessTokenValidator, TokenValidator};
