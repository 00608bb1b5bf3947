use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{self, doc},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOneOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::Deserialize;
use service_core::error::AppError;

use super::{
    HealthCheck, MembershipSource, OrganizationDetails, OrganizationRepository, RepositoryError,
    UserRepository, DUPLICATE_MEMBER, DUPLICATE_ORGANIZATION, DUPLICATE_USER,
};
use crate::models::{Membership, Organization, User};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

/// Projection of an organization document down to its members.
#[derive(Debug, Deserialize)]
struct MembersOnly {
    #[serde(rename = "organization_members", default)]
    members: Vec<Membership>,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for org-service");

        let org_name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("organization_name_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.organizations()
            .create_index(org_name_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create name index on organizations collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on organizations.name");

        let user_email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_email_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.users()
            .create_index(user_email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on users collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on users.email");

        Ok(())
    }

    pub fn organizations(&self) -> Collection<Organization> {
        self.db.collection("organizations")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn map_write_error(err: mongodb::error::Error, duplicate: &'static str) -> RepositoryError {
    if is_duplicate_key(&err) {
        RepositoryError::Duplicate(duplicate)
    } else {
        RepositoryError::from(err)
    }
}

#[async_trait]
impl MembershipSource for MongoDb {
    async fn memberships(&self, org_id: &str) -> Result<Vec<Membership>, RepositoryError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "organization_members": 1 })
            .build();

        self.organizations()
            .clone_with_type::<MembersOnly>()
            .find_one(doc! { "_id": org_id }, options)
            .await?
            .map(|projection| projection.members)
            .ok_or(RepositoryError::NotFound("organization"))
    }
}

#[async_trait]
impl OrganizationRepository for MongoDb {
    async fn create_organization(&self, org: &Organization) -> Result<(), RepositoryError> {
        self.organizations()
            .insert_one(org, None)
            .await
            .map_err(|e| map_write_error(e, DUPLICATE_ORGANIZATION))?;
        tracing::info!(org_id = %org.id, "Organization created");
        Ok(())
    }

    async fn find_organization(
        &self,
        org_id: &str,
    ) -> Result<Option<Organization>, RepositoryError> {
        Ok(self
            .organizations()
            .find_one(doc! { "_id": org_id }, None)
            .await?)
    }

    async fn update_organization(
        &self,
        org_id: &str,
        details: &OrganizationDetails,
    ) -> Result<Organization, RepositoryError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let update = doc! {
            "$set": {
                "name": details.name.as_str(),
                "description": details.description.as_str(),
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            }
        };

        self.organizations()
            .find_one_and_update(doc! { "_id": org_id }, update, options)
            .await
            .map_err(|e| map_write_error(e, DUPLICATE_ORGANIZATION))?
            .ok_or(RepositoryError::NotFound("organization"))
    }

    async fn delete_organization(&self, org_id: &str) -> Result<(), RepositoryError> {
        let result = self
            .organizations()
            .delete_one(doc! { "_id": org_id }, None)
            .await?;

        if result.deleted_count == 0 {
            return Err(RepositoryError::NotFound("organization"));
        }
        tracing::info!(org_id = %org_id, "Organization deleted");
        Ok(())
    }

    async fn add_member_if_absent(
        &self,
        org_id: &str,
        member: &Membership,
    ) -> Result<(), RepositoryError> {
        let member_bson = bson::to_bson(member)
            .map_err(|e| RepositoryError::Serialization(anyhow::Error::new(e)))?;

        // Matches only while the email is absent, so the append cannot race a
        // concurrent invite for the same address.
        let filter = doc! {
            "_id": org_id,
            "organization_members.email": { "$ne": member.email.as_str() },
        };
        let update = doc! {
            "$push": { "organization_members": member_bson },
            "$set": { "updated_at": bson::DateTime::from_chrono(Utc::now()) },
        };

        let result = self.organizations().update_one(filter, update, None).await?;
        if result.matched_count == 1 {
            return Ok(());
        }

        let exists = self
            .organizations()
            .count_documents(doc! { "_id": org_id }, None)
            .await?;
        if exists == 0 {
            Err(RepositoryError::NotFound("organization"))
        } else {
            Err(RepositoryError::Duplicate(DUPLICATE_MEMBER))
        }
    }
}

#[async_trait]
impl UserRepository for MongoDb {
    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.users()
            .insert_one(user, None)
            .await
            .map_err(|e| map_write_error(e, DUPLICATE_USER))?;
        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users().find_one(doc! { "_id": user_id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }
}

#[async_trait]
impl HealthCheck for MongoDb {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                RepositoryError::from(e)
            })?;
        Ok(())
    }
}
