//! Storage collaborators.
//!
//! The token and access-policy code never talks to a store directly; handlers use
//! these traits to fetch membership facts and persist changes.

mod memory;
mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoDb;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{Membership, Organization, User};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Duplicate(&'static str),

    #[error("Store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[source] anyhow::Error),
}

impl From<mongodb::error::Error> for RepositoryError {
    fn from(err: mongodb::error::Error) -> Self {
        RepositoryError::Unavailable(anyhow::Error::new(err))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            RepositoryError::Duplicate(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            RepositoryError::Unavailable(e) => AppError::ServiceUnavailable(e),
            RepositoryError::Serialization(e) => AppError::InternalError(e),
        }
    }
}

/// Name and description of an organization, the only fields an update may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationDetails {
    pub name: String,
    pub description: String,
}

/// Read access to an organization's membership list.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Members of `org_id`, or `NotFound` if the organization does not exist.
    async fn memberships(&self, org_id: &str) -> Result<Vec<Membership>, RepositoryError>;
}

#[async_trait]
pub trait OrganizationRepository: MembershipSource {
    /// Insert a new organization. Names are unique; a clash is `Duplicate`.
    async fn create_organization(&self, org: &Organization) -> Result<(), RepositoryError>;

    async fn find_organization(&self, org_id: &str)
        -> Result<Option<Organization>, RepositoryError>;

    /// Replace name and description, leaving members untouched.
    async fn update_organization(
        &self,
        org_id: &str,
        details: &OrganizationDetails,
    ) -> Result<Organization, RepositoryError>;

    async fn delete_organization(&self, org_id: &str) -> Result<(), RepositoryError>;

    /// Append `member` only if no member with the same email exists.
    ///
    /// The check and the append are one conditional write, so concurrent invites
    /// for the same email produce exactly one membership. Fails with `Duplicate`
    /// if the email is present and `NotFound` if the organization is gone.
    async fn add_member_if_absent(
        &self,
        org_id: &str,
        member: &Membership,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Emails are unique; a clash is `Duplicate`.
    async fn create_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), RepositoryError>;
}

pub(crate) const DUPLICATE_ORGANIZATION: &str = "organization name already exists";
pub(crate) const DUPLICATE_MEMBER: &str = "email already exists in the organization";
pub(crate) const DUPLICATE_USER: &str = "email already in use";
