use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use crate::models::activities::{self, NewActivity};

/// Append an activity that expires after `retention`.
pub async fn insert_activity(
    db: &DatabaseConnection,
    input: NewActivity,
    retention: chrono::Duration,
) -> Result<activities::Model, DbErr> {
    let now = Utc::now();
    let entry = activities::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(input.kind),
        actor_id: Set(input.actor_id),
        actor_name: Set(input.actor_name),
        gig_id: Set(input.gig_id),
        gig_title: Set(input.gig_title),
        created_at: Set(now),
        expires_at: Set(now + retention),
    };

    entry.insert(db).await
}

/// Most recent unexpired activities.
pub async fn get_recent_activities(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<activities::Model>, DbErr> {
    activities::Entity::find()
        .filter(activities::Column::ExpiresAt.gt(now))
        .order_by_desc(activities::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
}

/// Remove activities past their retention window.
pub async fn purge_expired_activities(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let result = activities::Entity::delete_many()
        .filter(activities::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
