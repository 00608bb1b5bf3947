use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::auth::{RefreshRequest, SignInRequest, SignInResponse, SignUpRequest, RefreshResponse};
use crate::dtos::MessageResponse;
use crate::models::User;
use crate::services::RefreshError;
use crate::utils::{
    hash_password, normalize_email, verify_password_or_dummy, Password, PasswordHashString,
    ValidatedJson,
};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let email = normalize_email(&req.email);
    let password_hash = hash_password(&Password::new(req.password))?;
    let user = User::new(req.name.trim().to_string(), email, password_hash.into_string());

    state.users.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("user created successfully")),
    ))
}

/// POST /auth/signin
pub async fn signin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let email = normalize_email(&req.email);

    let user = state.users.find_user_by_email(&email).await?;
    let stored_hash = user
        .as_ref()
        .map(|u| PasswordHashString::new(u.password_hash.clone()));

    let verified = verify_password_or_dummy(&Password::new(req.password), stored_hash.as_ref());
    let user = match (user, verified) {
        (Some(user), Ok(())) => user,
        (Some(user), Err(_)) => {
            tracing::info!(user_id = %user.id, "Sign-in failed: wrong password");
            return Err(AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS)));
        }
        (None, _) => {
            return Err(AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS)));
        }
    };

    let pair = state.tokens.issue_pair(&user.id)?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(SignInResponse {
        message: "user authenticated successfully".to_string(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let access_token = state
        .tokens
        .refresh(&req.refresh_token)
        .map_err(|e| match e {
            RefreshError::Token(reason) => {
                tracing::debug!(reason = %reason, "Refresh rejected");
                AppError::Unauthorized(anyhow::anyhow!("Invalid refresh token"))
            }
            RefreshError::Issue(e) => AppError::InternalError(e),
        })?;

    Ok(Json(RefreshResponse {
        message: "access token refreshed successfully".to_string(),
        access_token,
    }))
}
