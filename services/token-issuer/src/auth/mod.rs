//! Grant handling: claims identities, scopes and tickets.

pub mod service;
pub mod utils;

pub use service::{AuthService, ImpersonationCheck};
pub use utils::{is_impersonator, AuthUtils};

/// OAuth2 client credentials grant.
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
/// Grant letting a privileged caller obtain a token for another principal.
pub const IMPERSONATION_GRANT: &str = "impersonation";
/// Grant types served by the token endpoint.
pub const SUPPORTED_GRANT_TYPES: &[&str] = &[CLIENT_CREDENTIALS_GRANT, IMPERSONATION_GRANT];

/// OpenID Connect scope; always granted.
pub const OPENID_SCOPE: &str = "openid";
/// Role required to use the impersonation grant.
pub const IMPERSONATOR_ROLE: &str = "Impersonator";
