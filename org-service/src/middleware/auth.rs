use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{TokenError, TokenKind, TokenService};
use crate::AppState;

const BEARER_SCHEME: &str = "Bearer";

/// Authenticated caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Malformed authorization header")]
    MalformedHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::Header(e) => e.to_string(),
            AuthRejection::Token(TokenError::Expired) => "Token has expired".to_string(),
            AuthRejection::Token(_) => "Invalid token".to_string(),
        };

        (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// The scheme is matched case-insensitively and exactly one space separates it
/// from the token.
pub fn parse_bearer(value: Option<&HeaderValue>) -> Result<&str, HeaderError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Err(HeaderError::MissingToken),
    };

    let value = value.to_str().map_err(|_| HeaderError::MalformedHeader)?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(HeaderError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() || token.contains(' ') {
        return Err(HeaderError::MalformedHeader);
    }

    Ok(token)
}

/// Turns request headers into a [`Principal`], independent of any framework hook.
#[derive(Clone)]
pub struct AuthGate {
    tokens: TokenService,
}

impl AuthGate {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthRejection> {
        let token = parse_bearer(headers.get(header::AUTHORIZATION))?;
        let subject_id = self.tokens.validate(token, TokenKind::Access)?;
        Ok(Principal { subject_id })
    }
}

/// Middleware to require a valid access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let principal = state.auth_gate.authenticate(req.headers()).map_err(|e| {
        tracing::debug!(reason = %e, path = %req.uri().path(), "Rejected request");
        e
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Extractor for the principal attached by [`auth_middleware`].
pub struct AuthUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts.extensions.get::<Principal>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Principal missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AuthUser(principal.clone()))
    }
}
