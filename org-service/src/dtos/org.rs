use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Membership, Organization};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,
}

/// Same shape as creation; members cannot be changed through an update.
pub type UpdateOrganizationRequest = CreateOrganizationRequest;

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub user_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrganizationResponse {
    pub organization_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrganizationResponse {
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub organization_members: Vec<Membership>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            organization_id: org.id,
            name: org.name,
            description: org.description,
            organization_members: org.members,
            created_at: org.created_at,
            updated_at: org.updated_at,
        }
    }
}
