use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::users::PublicProfile;

/// Ping status stored as a lowercase string. Rejection deletes the row, so
/// there is no `rejected` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
}

/// SeaORM entity for the `pings` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gig_id: Uuid,
    pub applicant_id: Uuid,
    pub poster_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub portfolio_link: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub portfolio_description: Option<String>,
    pub status: PingStatus,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gigs::Entity",
        from = "Column::GigId",
        to = "super::gigs::Column::Id"
    )]
    Gig,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ApplicantId",
        to = "super::users::Column::Id"
    )]
    Applicant,
}

impl Related<super::gigs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gig.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applicant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for `POST /api/pings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitPing {
    pub gig_id: Uuid,
    #[serde(default)]
    pub message: String,
    pub portfolio_link: Option<String>,
    pub portfolio_description: Option<String>,
}

/// Request body for `POST /api/pings/{id}/accept`.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptPing {
    pub gig_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewPing {
    pub gig_id: Uuid,
    pub applicant_id: Uuid,
    pub poster_id: Uuid,
    pub message: String,
    pub portfolio_link: Option<String>,
    pub portfolio_description: Option<String>,
}

/// Result of the acceptance transaction.
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted {
        ping: Model,
        gig: super::gigs::Model,
        discarded: u64,
    },
    /// The gig was no longer `active` when the conditional update ran.
    GigNotActive,
    /// Ping or gig vanished between lookup and transaction.
    Missing,
}

/// A ping joined with the applicant's public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingWithApplicant {
    #[serde(flatten)]
    pub ping: Model,
    pub applicant: Option<PublicProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingedResponse {
    pub pinged: bool,
}
