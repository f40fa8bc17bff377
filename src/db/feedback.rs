use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::models::feedback::{self, NewFeedback};

pub async fn insert_feedback(
    db: &DatabaseConnection,
    input: NewFeedback,
) -> Result<feedback::Model, DbErr> {
    let entry = feedback::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        email: Set(input.email),
        message: Set(input.message),
        rating: Set(input.rating),
        created_at: Set(Utc::now()),
    };

    entry.insert(db).await
}

/// Latest feedback entries, newest first.
pub async fn get_recent_feedback(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<feedback::Model>, DbErr> {
    feedback::Entity::find()
        .order_by_desc(feedback::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
}
