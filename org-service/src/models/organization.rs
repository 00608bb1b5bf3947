use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission tier of a member within one organization.
///
/// Stored as a plain integer. `NONE` is never stored; it is the level reported
/// for someone who is not a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub i32);

impl AccessLevel {
    pub const NONE: AccessLevel = AccessLevel(-1);
    pub const MEMBER: AccessLevel = AccessLevel(0);
    pub const OWNER: AccessLevel = AccessLevel(1);
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub name: String,
    pub email: String,
    pub access_level: AccessLevel,
}

impl Membership {
    pub fn owner(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            access_level: AccessLevel::OWNER,
        }
    }

    pub fn member(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            access_level: AccessLevel::MEMBER,
        }
    }
}

/// An organization and its membership list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// MongoDB document ID (UUID string)
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "organization_members", default)]
    pub members: Vec<Membership>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization whose only member is its creator, as owner.
    pub fn new(name: String, description: String, creator: Membership) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            members: vec![Membership {
                access_level: AccessLevel::OWNER,
                ..creator
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, email: &str) -> Option<&Membership> {
        self.members.iter().find(|m| m.email == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organization_has_creator_as_owner() {
        let org = Organization::new(
            "Acme".to_string(),
            "Widgets".to_string(),
            Membership::member("Alice", "alice@example.com"),
        );
        assert_eq!(
            org.members,
            vec![Membership::owner("Alice", "alice@example.com")]
        );
        assert!(Uuid::parse_str(&org.id).is_ok());
    }

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel::NONE < AccessLevel::MEMBER);
        assert!(AccessLevel::MEMBER < AccessLevel::OWNER);
        assert_eq!(serde_json::to_value(AccessLevel::OWNER).unwrap(), 1);
    }

    #[test]
    fn test_bson_field_names() {
        let org = Organization::new(
            "Acme".to_string(),
            String::new(),
            Membership::owner("Alice", "alice@example.com"),
        );
        let doc = mongodb::bson::to_document(&org).unwrap();
        assert!(doc.contains_key("_id"));
        let members = doc.get_array("organization_members").unwrap();
        let first = members[0].as_document().unwrap();
        assert_eq!(first.get_i32("access_level").unwrap(), 1);
        assert!(doc.get_datetime("created_at").is_ok());
    }
}
