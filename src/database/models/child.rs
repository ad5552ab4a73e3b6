use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a user is related to a child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "relation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Parent,
    Teacher,
    Educator,
    Other,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Parent => "parent",
            RelationType::Teacher => "teacher",
            RelationType::Educator => "educator",
            RelationType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Child {
    pub id: Uuid,
    pub name: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserChildRelation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub child_id: Uuid,
    pub relation_type: RelationType,
    pub is_administrator: bool,
    pub created_at: DateTime<Utc>,
}

/// A child as seen by one of its related users
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildWithRelation {
    pub id: Uuid,
    pub name: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub relation_type: RelationType,
    pub is_administrator: bool,
}

/// A user related to a child, joined with the relation row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Caregiver {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub relation_type: RelationType,
    pub is_administrator: bool,
    pub related_since: DateTime<Utc>,
}
