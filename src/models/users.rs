use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ContactLinks, StringList};

/// The `Roles` enum maps to a Postgres TEXT column stored as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Roles {
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "freelancer")]
    Freelancer,
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// SeaORM entity for the `users` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub auth_provider: String,
    pub role: Roles,
    pub activity_public: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub skills: StringList,
    pub location: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub contact_links: ContactLinks,
    pub report_count: i32,
    pub is_banned: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gigs::Entity")]
    Gigs,
}

impl Related<super::gigs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gigs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Best-effort human name: display name, then username, then the email's local part.
    pub fn public_name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .unwrap_or(&self.email)
                    .to_string()
            })
    }
}

// ── DTOs (not stored in DB, used for request bodies) ──

/// Used internally by the auth middleware to create a user from JWT claims.
#[derive(Debug, Clone)]
pub struct CreateUserFromAuth {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub auth_provider: String,
    pub role: Roles,
}

/// Used by the `POST /api/auth/complete-profile` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteProfile {
    pub username: Option<String>,
    pub role: Option<Roles>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Self-service profile edit (`PUT /api/users/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub location: Option<String>,
    pub contact_links: Option<ContactLinks>,
    pub activity_public: Option<bool>,
    pub role: Option<Roles>,
}

/// A safe user representation for API responses (never leaks moderation fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Roles,
    pub activity_public: bool,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub contact_links: ContactLinks,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl From<Model> for UserResponse {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            display_name: m.display_name,
            avatar_url: m.avatar_url,
            role: m.role,
            activity_public: m.activity_public,
            bio: m.bio,
            skills: m.skills.0,
            location: m.location,
            contact_links: m.contact_links,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Public applicant card attached to pings for the gig owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
}

impl From<&Model> for PublicProfile {
    fn from(m: &Model) -> Self {
        Self {
            id: m.id,
            name: m.public_name(),
            email: m.email.clone(),
            photo: m.avatar_url.clone(),
        }
    }
}
