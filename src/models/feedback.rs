use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `feedback` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub rating: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitFeedback {
    #[serde(default)]
    pub message: String,
    pub email: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub message: String,
    pub rating: Option<i32>,
}
