//! Principals, claims and tickets.

pub mod claims;
pub mod directory;
pub mod ticket;

pub use claims::{Claim, ClaimsIdentity, ClaimsPrincipal, Destination};
pub use directory::{MemoryDirectory, PrincipalDirectory};
pub use ticket::AuthenticationTicket;

/// Authentication scheme stamped on identities and tickets built here.
pub const AUTHENTICATION_SCHEME: &str = "token-issuer";
