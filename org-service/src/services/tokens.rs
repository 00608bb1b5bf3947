use chrono::Duration;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::clock::{Clock, SystemClock};
use super::token_codec::{Claims, TokenCodec, TokenError, TokenKind};

/// Access tokens live for 15 minutes.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
/// Refresh tokens live for 7 days.
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Token pair returned on sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Issue(#[from] anyhow::Error),
}

/// Issues and validates stateless bearer tokens.
///
/// Nothing about issued tokens is recorded server side, so a token stays valid
/// until its `exp` and refreshing does not invalidate the refresh token used.
#[derive(Clone)]
pub struct TokenService {
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: Secret<String>) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: Secret<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec: Arc::new(TokenCodec::new(secret)),
            clock,
        }
    }

    fn claims(&self, subject_id: &str, kind: TokenKind) -> Claims {
        let now = self.clock.now();
        let ttl = match kind {
            TokenKind::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECONDS),
            TokenKind::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECONDS),
        };

        Claims {
            user_id: subject_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            kind,
        }
    }

    /// Generate an access token for a user
    pub fn issue_access_token(&self, subject_id: &str) -> Result<String, anyhow::Error> {
        self.codec.encode(&self.claims(subject_id, TokenKind::Access))
    }

    /// Generate both access and refresh tokens
    pub fn issue_pair(&self, subject_id: &str) -> Result<TokenPair, anyhow::Error> {
        let pair = TokenPair {
            access_token: self.issue_access_token(subject_id)?,
            refresh_token: self
                .codec
                .encode(&self.claims(subject_id, TokenKind::Refresh))?,
        };
        tracing::debug!(user_id = %subject_id, "Issued token pair");
        Ok(pair)
    }

    /// Check signature, expiry and kind, returning the subject on success.
    pub fn validate(&self, token: &str, expected_kind: TokenKind) -> Result<String, TokenError> {
        let claims = self.codec.decode(token)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.kind != expected_kind {
            return Err(TokenError::WrongKind {
                expected: expected_kind,
                actual: claims.kind,
            });
        }

        Ok(claims.user_id)
    }

    /// Exchange a refresh token for a fresh access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let subject_id = self.validate(refresh_token, TokenKind::Refresh)?;
        let access_token = self.issue_access_token(&subject_id)?;
        tracing::debug!(user_id = %subject_id, "Refreshed access token");
        Ok(access_token)
    }

    /// Decode without expiry or kind checks. Used for inspection in tests and tooling.
    pub fn peek(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.decode(token)
    }
}
