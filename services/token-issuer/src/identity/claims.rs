//! Claims, identities and principals.
//!
//! Every claim records which token types it is embedded into. Claims
//! without a destination stay inside the server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Subject claim type.
pub const SUBJECT: &str = "sub";
/// Display name claim type.
pub const NAME: &str = "name";
/// Role claim type; the value is a JSON array of role names.
pub const ROLE: &str = "role";
/// Client id claim type.
pub const CLIENT_ID: &str = "client_id";

/// Token type a claim is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The access token
    AccessToken,
    /// The OpenID Connect identity token
    IdentityToken,
}

/// A single typed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    claim_type: String,
    value: String,
    destinations: BTreeSet<Destination>,
}

impl Claim {
    /// Create a claim with no destination.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            destinations: BTreeSet::new(),
        }
    }

    /// Add destinations to the claim.
    #[must_use]
    pub fn with_destinations(mut self, destinations: &[Destination]) -> Self {
        self.destinations.extend(destinations.iter().copied());
        self
    }

    /// Claim type.
    #[must_use]
    pub fn claim_type(&self) -> &str {
        &self.claim_type
    }

    /// Claim value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the claim goes into tokens of type `destination`.
    #[must_use]
    pub fn has_destination(&self, destination: Destination) -> bool {
        self.destinations.contains(&destination)
    }

    /// All destinations.
    #[must_use]
    pub const fn destinations(&self) -> &BTreeSet<Destination> {
        &self.destinations
    }
}

/// A named bundle of claims describing one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsIdentity {
    authentication_type: String,
    claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// Create an empty identity authenticated by `authentication_type`.
    #[must_use]
    pub fn new(authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            claims: Vec::new(),
        }
    }

    /// Authentication scheme tag.
    #[must_use]
    pub fn authentication_type(&self) -> &str {
        &self.authentication_type
    }

    /// Append a claim.
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Builder form of [`Self::add_claim`].
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.add_claim(claim);
        self
    }

    /// All claims in insertion order.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// First claim of `claim_type`.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    /// Subject claim value.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.find_first(SUBJECT).map(Claim::value)
    }

    /// Name claim value.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.find_first(NAME).map(Claim::value)
    }

    /// Role names carried by the identity.
    ///
    /// A role claim holding a JSON array contributes each element; any
    /// other value is taken as a single role name.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        self.claims
            .iter()
            .filter(|c| c.claim_type == ROLE)
            .flat_map(|c| decode_roles(&c.value))
            .collect()
    }

    /// Whether `role` is one of [`Self::roles`].
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }
}

/// Role names held by one `role` claim value: the elements of a JSON
/// array, or the whole value as a single role.
#[must_use]
pub fn decode_roles(value: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(value).unwrap_or_else(|_| vec![value.to_string()])
}

/// One or more identities acting as a single caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsPrincipal {
    identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    /// Principal with a single identity.
    #[must_use]
    pub fn new(identity: ClaimsIdentity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    /// Add another identity.
    pub fn add_identity(&mut self, identity: ClaimsIdentity) {
        self.identities.push(identity);
    }

    /// All identities, primary first.
    #[must_use]
    pub fn identities(&self) -> &[ClaimsIdentity] {
        &self.identities
    }

    /// The primary identity.
    #[must_use]
    pub fn identity(&self) -> Option<&ClaimsIdentity> {
        self.identities.first()
    }

    /// Claims across every identity.
    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.identities.iter().flat_map(|i| i.claims.iter())
    }

    /// First claim of `claim_type` across identities.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims().find(|c| c.claim_type == claim_type)
    }

    /// Subject of the principal.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.find_first(SUBJECT).map(Claim::value)
    }

    /// Whether any identity carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.identities.iter().any(|i| i.has_role(role))
    }
}
