use jsonwebtoken::{decode, decode_header, encode, Header, Validation};

use crate::certificates::SigningCredential;
use crate::error::IssuerError;
use crate::jwt::claims::Claims;

/// Compact JWS encoding bound to a signing credential.
pub struct JwtSerializer;

impl JwtSerializer {
    /// Sign `claims` with `credential`, stamping its key id into the header.
    ///
    /// # Errors
    ///
    /// [`IssuerError::JwtEncoding`] if signing fails.
    pub fn serialize(claims: &Claims, credential: &SigningCredential) -> Result<String, IssuerError> {
        let mut header = Header::new(credential.algorithm());
        header.kid = Some(credential.key_id().to_string());

        encode(&header, claims, credential.encoding_key())
            .map_err(|e| IssuerError::JwtEncoding(e.to_string()))
    }

    /// Verify `token` against `credential` and the expected issuer and audience.
    ///
    /// # Errors
    ///
    /// [`IssuerError::TokenInvalid`] for any signature, time or claim failure.
    pub fn deserialize(
        token: &str,
        credential: &SigningCredential,
        issuer: &str,
        audience: &str,
    ) -> Result<Claims, IssuerError> {
        let mut validation = Validation::new(credential.algorithm());
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data = decode::<Claims>(token, credential.decoding_key(), &validation)?;
        Ok(token_data.claims)
    }

    /// Key id from the unverified header.
    ///
    /// # Errors
    ///
    /// [`IssuerError::TokenInvalid`] when the header is malformed or has no `kid`.
    pub fn key_id(token: &str) -> Result<String, IssuerError> {
        decode_header(token)?
            .kid
            .ok_or_else(|| IssuerError::token_invalid("token header has no key id"))
    }
}
