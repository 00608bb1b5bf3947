use axum::{extract::State, Json};
use service_core::error::AppError;

use super::current_user;
use crate::middleware::AuthUser;
use crate::models::SanitizedUser;
use crate::AppState;

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<SanitizedUser>, AppError> {
    let user = current_user(&state, &principal).await?;
    Ok(Json(user.sanitized()))
}
