use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{
    HealthCheck, MembershipSource, OrganizationDetails, OrganizationRepository, RepositoryError,
    UserRepository, DUPLICATE_MEMBER, DUPLICATE_ORGANIZATION, DUPLICATE_USER,
};
use crate::models::{Membership, Organization, User};

/// Process-local store with the same uniqueness rules as the Mongo collections.
///
/// Used by tests and for running the service without a database.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    organizations: Mutex<HashMap<String, Organization>>,
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn organizations(&self) -> Result<MutexGuard<'_, HashMap<String, Organization>>, RepositoryError> {
        self.organizations.lock().map_err(|e| {
            RepositoryError::Unavailable(anyhow::anyhow!("In-memory store mutex poisoned: {}", e))
        })
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<String, User>>, RepositoryError> {
        self.users.lock().map_err(|e| {
            RepositoryError::Unavailable(anyhow::anyhow!("In-memory store mutex poisoned: {}", e))
        })
    }
}

#[async_trait]
impl MembershipSource for InMemoryStore {
    async fn memberships(&self, org_id: &str) -> Result<Vec<Membership>, RepositoryError> {
        self.organizations()?
            .get(org_id)
            .map(|org| org.members.clone())
            .ok_or(RepositoryError::NotFound("organization"))
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryStore {
    async fn create_organization(&self, org: &Organization) -> Result<(), RepositoryError> {
        let mut orgs = self.organizations()?;
        if orgs.values().any(|o| o.name == org.name) {
            return Err(RepositoryError::Duplicate(DUPLICATE_ORGANIZATION));
        }
        orgs.insert(org.id.clone(), org.clone());
        Ok(())
    }

    async fn find_organization(
        &self,
        org_id: &str,
    ) -> Result<Option<Organization>, RepositoryError> {
        Ok(self.organizations()?.get(org_id).cloned())
    }

    async fn update_organization(
        &self,
        org_id: &str,
        details: &OrganizationDetails,
    ) -> Result<Organization, RepositoryError> {
        let mut orgs = self.organizations()?;
        if orgs
            .values()
            .any(|o| o.id != org_id && o.name == details.name)
        {
            return Err(RepositoryError::Duplicate(DUPLICATE_ORGANIZATION));
        }

        let org = orgs
            .get_mut(org_id)
            .ok_or(RepositoryError::NotFound("organization"))?;
        org.name = details.name.clone();
        org.description = details.description.clone();
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn delete_organization(&self, org_id: &str) -> Result<(), RepositoryError> {
        self.organizations()?
            .remove(org_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound("organization"))
    }

    async fn add_member_if_absent(
        &self,
        org_id: &str,
        member: &Membership,
    ) -> Result<(), RepositoryError> {
        let mut orgs = self.organizations()?;
        let org = orgs
            .get_mut(org_id)
            .ok_or(RepositoryError::NotFound("organization"))?;

        if org.member(&member.email).is_some() {
            return Err(RepositoryError::Duplicate(DUPLICATE_MEMBER));
        }

        org.members.push(member.clone());
        org.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users()?;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate(DUPLICATE_USER));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users()?.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users()?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.organizations()?;
        self.users()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn org(name: &str) -> Organization {
        Organization::new(
            name.to_string(),
            "desc".to_string(),
            Membership::owner("Alice", "alice@example.com"),
        )
    }

    #[tokio::test]
    async fn test_duplicate_organization_name() {
        let store = InMemoryStore::new();
        store.create_organization(&org("Acme")).await.unwrap();
        assert!(matches!(
            store.create_organization(&org("Acme")).await,
            Err(RepositoryError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_add_member_if_absent() {
        let store = InMemoryStore::new();
        let acme = org("Acme");
        store.create_organization(&acme).await.unwrap();

        let bob = Membership::member("Bob", "bob@example.com");
        store.add_member_if_absent(&acme.id, &bob).await.unwrap();
        assert!(matches!(
            store.add_member_if_absent(&acme.id, &bob).await,
            Err(RepositoryError::Duplicate(_))
        ));

        let members = store.memberships(&acme.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1], bob);
    }

    #[tokio::test]
    async fn test_add_member_to_missing_org() {
        let store = InMemoryStore::new();
        let bob = Membership::member("Bob", "bob@example.com");
        assert!(matches!(
            store.add_member_if_absent("missing", &bob).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_members() {
        let store = InMemoryStore::new();
        let acme = org("Acme");
        store.create_organization(&acme).await.unwrap();

        let updated = store
            .update_organization(
                &acme.id,
                &OrganizationDetails {
                    name: "Acme Ltd".to_string(),
                    description: "New".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Acme Ltd");
        assert_eq!(updated.members, acme.members);
    }

    #[tokio::test]
    async fn test_concurrent_invites_produce_one_member() {
        let store = Arc::new(InMemoryStore::new());
        let acme = org("Acme");
        store.create_organization(&acme).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let id = acme.id.clone();
                tokio::spawn(async move {
                    store
                        .add_member_if_absent(&id, &Membership::member("Bob", "bob@example.com"))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.memberships(&acme.id).await.unwrap().len(), 2);
    }
}
