//! Access-level authorization over organization memberships.
//!
//! The decision functions are pure; `AccessPolicy` only adds the membership
//! lookup through a [`MembershipSource`].

use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

pub use crate::models::AccessLevel;
use crate::models::Membership;
use crate::repository::{MembershipSource, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    NotAMember,
    InsufficientLevel,
}

/// Known caller, denied permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Not a member of this organization")]
    NotAMember,

    #[error("Insufficient access level")]
    InsufficientLevel,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::NotAMember => Err(AccessError::NotAMember),
            AccessDecision::InsufficientLevel => Err(AccessError::InsufficientLevel),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::Forbidden(anyhow::Error::new(err))
    }
}

/// The membership list could not be consulted.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Membership store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<RepositoryError> for PolicyError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => PolicyError::OrganizationNotFound,
            other => PolicyError::Unavailable(anyhow::Error::new(other)),
        }
    }
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::OrganizationNotFound => {
                AppError::NotFound(anyhow::anyhow!("Organization not found"))
            }
            PolicyError::Unavailable(e) => AppError::ServiceUnavailable(e),
        }
    }
}

/// Level of `email` in `members`, or `NONE` with `NotAMember`.
pub fn membership_decision(members: &[Membership], email: &str) -> (AccessLevel, AccessDecision) {
    match members.iter().find(|m| m.email == email) {
        Some(member) => (member.access_level, AccessDecision::Allow),
        None => (AccessLevel::NONE, AccessDecision::NotAMember),
    }
}

pub fn level_decision(members: &[Membership], email: &str, min_level: AccessLevel) -> AccessDecision {
    match membership_decision(members, email) {
        (_, AccessDecision::NotAMember) => AccessDecision::NotAMember,
        (level, _) if level < min_level => AccessDecision::InsufficientLevel,
        _ => AccessDecision::Allow,
    }
}

pub struct AccessPolicy<M: MembershipSource + ?Sized> {
    source: Arc<M>,
}

impl<M: MembershipSource + ?Sized> Clone for AccessPolicy<M> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<M: MembershipSource + ?Sized> AccessPolicy<M> {
    pub fn new(source: Arc<M>) -> Self {
        Self { source }
    }

    pub async fn require_membership(
        &self,
        org_id: &str,
        email: &str,
    ) -> Result<(AccessLevel, AccessDecision), PolicyError> {
        let members = self.source.memberships(org_id).await?;
        let (level, decision) = membership_decision(&members, email);
        if !decision.is_allowed() {
            tracing::info!(org_id = %org_id, "Access denied: not a member");
        }
        Ok((level, decision))
    }

    pub async fn require_level(
        &self,
        org_id: &str,
        email: &str,
        min_level: AccessLevel,
    ) -> Result<AccessDecision, PolicyError> {
        let members = self.source.memberships(org_id).await?;
        let decision = level_decision(&members, email, min_level);
        if !decision.is_allowed() {
            tracing::info!(
                org_id = %org_id,
                required = %min_level,
                decision = ?decision,
                "Access denied"
            );
        }
        Ok(decision)
    }
}
