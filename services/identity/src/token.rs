//! Session token codec
//!
//! Signs and verifies the session token payload with HS256 and a
//! process-wide shared secret. The codec guarantees payload integrity and
//! authenticity only: the token carries no `exp` claim, freshness is derived
//! from `iat` by the session service, so `exp` validation is disabled here.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Payload embedded verbatim inside the signed session token
///
/// Immutable once issued. `iat` is epoch milliseconds at issuance and is the
/// sole basis for expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// User display name
    pub name: String,
    /// When the user record was created
    pub created_at: DateTime<Utc>,
    /// Issued-at time in epoch milliseconds
    pub iat: i64,
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec from the shared signing secret
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        TokenCodec {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a claims payload into a compact token string
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token and return its claims
    ///
    /// Fails closed: malformed input, a wrong signature, and an unsupported
    /// algorithm all surface as the same `InvalidToken` kind, so callers
    /// cannot distinguish attack vectors from encoding bugs.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
