use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ContactInfo, StringList};

/// Gig status stored as a lowercase string in the database.
///
/// `Active` is the only non-terminal state; see [`GigStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum GigStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl GigStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GigStatus::Active)
    }

    /// Forward-only state machine: every edge leaves `Active`, nothing leaves a terminal state.
    pub fn can_transition_to(self, next: GigStatus) -> bool {
        matches!(
            (self, next),
            (GigStatus::Active, GigStatus::Archived)
                | (GigStatus::Active, GigStatus::Expired)
                | (GigStatus::Active, GigStatus::Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GigStatus::Active => "active",
            GigStatus::Archived => "archived",
            GigStatus::Expired => "expired",
            GigStatus::Completed => "completed",
        }
    }
}

/// SeaORM entity for the `gigs` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gigs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_by: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub skills_required: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub contact: ContactInfo,
    pub display_contact_links: bool,
    #[sea_orm(column_type = "Double")]
    pub budget: f64,
    pub status: GigStatus,
    pub expires_at: DateTimeUtc,
    pub accepted_applicant_id: Option<Uuid>,
    pub report_count: i32,
    pub is_flagged: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pings::Entity")]
    Pings,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Owner,
}

impl Related<super::pings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pings.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for `POST /api/gigs`. Every field is optional at the serde level
/// so that missing input surfaces as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateGig {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub budget: Option<f64>,
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub display_contact_links: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Request body for `PUT /api/gigs/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub status: Option<GigStatus>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub skills_required: Option<Vec<String>>,
    pub contact: Option<ContactInfo>,
}

/// Request body for `PUT /api/gigs/{id}/contact-visibility`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactVisibility {
    pub display_contact_links: bool,
}

/// A validated gig ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewGig {
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub skills_required: Vec<String>,
    pub contact: ContactInfo,
    pub display_contact_links: bool,
    pub budget: f64,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Field-level changes applied by an owner edit. Status changes go through
/// the conditional transition path instead.
#[derive(Debug, Clone, Default)]
pub struct GigChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub skills_required: Option<Vec<String>>,
    pub contact: Option<ContactInfo>,
    pub display_contact_links: Option<bool>,
}

impl GigChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.budget.is_none()
            && self.expires_at.is_none()
            && self.skills_required.is_none()
            && self.contact.is_none()
            && self.display_contact_links.is_none()
    }
}

/// API representation of a gig; contact details are stripped unless the owner opted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub skills_required: Vec<String>,
    pub contact: Option<ContactInfo>,
    pub display_contact_links: bool,
    pub budget: f64,
    pub status: GigStatus,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub accepted_applicant_id: Option<Uuid>,
    pub report_count: i32,
    pub is_flagged: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Model> for GigResponse {
    fn from(m: Model) -> Self {
        let contact = m.display_contact_links.then_some(m.contact);
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            created_by: m.created_by,
            skills_required: m.skills_required.0,
            contact,
            display_contact_links: m.display_contact_links,
            budget: m.budget,
            status: m.status,
            expires_at: m.expires_at,
            accepted_applicant_id: m.accepted_applicant_id,
            report_count: m.report_count,
            is_flagged: m.is_flagged,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// One cached page of the public listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigPage {
    pub items: Vec<GigResponse>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}
