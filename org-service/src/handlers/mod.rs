pub mod auth;
pub mod health;
pub mod metrics;
pub mod org;
pub mod user;

use service_core::error::AppError;

use crate::middleware::Principal;
use crate::models::User;
use crate::AppState;

/// Load the account behind an authenticated principal.
///
/// A valid token whose user has since disappeared is treated as unauthenticated.
pub(crate) async fn current_user(state: &AppState, principal: &Principal) -> Result<User, AppError> {
    state
        .users
        .find_user_by_id(&principal.subject_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal.subject_id, "Token subject has no account");
            AppError::Unauthorized(anyhow::anyhow!("Unknown user"))
        })
}
