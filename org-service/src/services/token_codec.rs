//! Compact signed token format.
//!
//! `base64url(header).base64url(payload).base64url(signature)`, no padding, where
//! the signature is HMAC-SHA256 over `header.payload` as it appears on the wire.
//! Signing and verification go through `jsonwebtoken` restricted to `HS256`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub user_id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Expected {expected} token, got {actual} token")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::MalformedToken,
        }
    }
}

/// Encodes and decodes signed tokens with a single process-wide secret.
///
/// Expiry and kind are left to `TokenService`, which judges them against its clock.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: Secret<String>) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, anyhow::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }

    /// Verify the signature and return the claims. Expiry and kind are not checked here.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        check_segments(token)?;
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Exactly three segments, each valid unpadded base64url.
fn check_segments(token: &str) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::MalformedToken);
    }

    for segment in segments {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| TokenError::MalformedToken)?;
    }
    Ok(())
}
