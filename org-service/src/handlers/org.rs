//! Organization handlers.
//!
//! Every route here runs behind `auth_middleware`. Reads need any membership,
//! mutations need owner level.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::current_user;
use crate::dtos::org::{
    CreateOrganizationRequest, CreateOrganizationResponse, InviteRequest, OrganizationResponse,
    UpdateOrganizationRequest,
};
use crate::dtos::MessageResponse;
use crate::middleware::AuthUser;
use crate::models::{AccessLevel, Membership, Organization};
use crate::repository::OrganizationDetails;
use crate::utils::{normalize_email, ValidatedJson};
use crate::AppState;

async fn authorize(
    state: &AppState,
    principal: &crate::middleware::Principal,
    org_id: &str,
    min_level: AccessLevel,
) -> Result<(), AppError> {
    let user = current_user(state, principal).await?;
    state
        .policy
        .require_level(org_id, &user.email, min_level)
        .await?
        .into_result()?;
    Ok(())
}

/// POST /organizations
pub async fn create_organization(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<CreateOrganizationResponse>), AppError> {
    let user = current_user(&state, &principal).await?;

    let org = Organization::new(
        req.name.trim().to_string(),
        req.description,
        Membership::owner(user.name, user.email),
    );
    state.organizations.create_organization(&org).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrganizationResponse {
            organization_id: org.id,
        }),
    ))
}

/// GET /organizations/:id
pub async fn get_organization(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(org_id): Path<String>,
) -> Result<Json<OrganizationResponse>, AppError> {
    authorize(&state, &principal, &org_id, AccessLevel::MEMBER).await?;

    let org = state
        .organizations
        .find_organization(&org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Organization not found")))?;

    Ok(Json(org.into()))
}

/// PUT /organizations/:id
pub async fn update_organization(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(org_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, AppError> {
    authorize(&state, &principal, &org_id, AccessLevel::OWNER).await?;

    let details = OrganizationDetails {
        name: req.name.trim().to_string(),
        description: req.description,
    };
    let org = state
        .organizations
        .update_organization(&org_id, &details)
        .await?;
    tracing::info!(org_id = %org_id, "Organization updated");

    Ok(Json(org.into()))
}

/// DELETE /organizations/:id
pub async fn delete_organization(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(org_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&state, &principal, &org_id, AccessLevel::OWNER).await?;

    state.organizations.delete_organization(&org_id).await?;

    Ok(Json(MessageResponse::new("organization deleted successfully")))
}

/// POST /organizations/:id/invite
pub async fn invite_member(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(org_id): Path<String>,
    ValidatedJson(req): ValidatedJson<InviteRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&state, &principal, &org_id, AccessLevel::OWNER).await?;

    let email = normalize_email(&req.user_email);
    let invitee = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No account for invited email")))?;

    state
        .organizations
        .add_member_if_absent(&org_id, &Membership::member(invitee.name, invitee.email))
        .await?;
    tracing::info!(org_id = %org_id, invitee_id = %invitee.id, "Member invited");

    Ok(Json(MessageResponse::new(
        "user invited to organization successfully",
    )))
}
