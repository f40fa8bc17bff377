use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::gigs::{self, GigStatus};
use crate::models::pings::{self, AcceptOutcome, NewPing, PingStatus};

/// Insert a new ping (always `pending`).
pub async fn insert_ping(db: &DatabaseConnection, input: NewPing) -> Result<pings::Model, DbErr> {
    let new_ping = pings::ActiveModel {
        id: Set(Uuid::new_v4()),
        gig_id: Set(input.gig_id),
        applicant_id: Set(input.applicant_id),
        poster_id: Set(input.poster_id),
        message: Set(input.message),
        portfolio_link: Set(input.portfolio_link),
        portfolio_description: Set(input.portfolio_description),
        status: Set(PingStatus::Pending),
        created_at: Set(Utc::now()),
    };

    new_ping.insert(db).await
}

/// Fetch a single ping by ID.
pub async fn get_ping_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<pings::Model>, DbErr> {
    pings::Entity::find_by_id(id).one(db).await
}

/// Check whether `applicant_id` already pinged `gig_id`.
pub async fn ping_exists(
    db: &DatabaseConnection,
    gig_id: Uuid,
    applicant_id: Uuid,
) -> Result<bool, DbErr> {
    let count = pings::Entity::find()
        .filter(pings::Column::GigId.eq(gig_id))
        .filter(pings::Column::ApplicantId.eq(applicant_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Fetch all pings on a gig, oldest first.
pub async fn get_pings_by_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
) -> Result<Vec<pings::Model>, DbErr> {
    pings::Entity::find()
        .filter(pings::Column::GigId.eq(gig_id))
        .order_by_asc(pings::Column::CreatedAt)
        .all(db)
        .await
}

/// Fetch all pings sent by an applicant, newest first.
pub async fn get_pings_by_applicant(
    db: &DatabaseConnection,
    applicant_id: Uuid,
) -> Result<Vec<pings::Model>, DbErr> {
    pings::Entity::find()
        .filter(pings::Column::ApplicantId.eq(applicant_id))
        .order_by_desc(pings::Column::CreatedAt)
        .all(db)
        .await
}

/// Delete a ping by ID.
/// Delete a pending ping. Accepted pings are left alone.
pub async fn delete_ping(db: &DatabaseConnection, id: Uuid) -> Result<bool, DbErr> {
    let result = pings::Entity::delete_many()
        .filter(pings::Column::Id.eq(id))
        .filter(pings::Column::Status.eq(PingStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Accept a ping in one transaction.
///
/// The gig is claimed with a conditional update (`status = 'active'`), so of two
/// concurrent acceptances on the same gig only one commits. The accepted ping is
/// flipped and every other ping on the gig is deleted before the commit.
pub async fn accept_ping(
    db: &DatabaseConnection,
    ping_id: Uuid,
    gig_id: Uuid,
) -> Result<AcceptOutcome, DbErr> {
    let txn = db.begin().await?;

    // Locked so a concurrent reject cannot delete the ping mid-acceptance.
    let ping = match pings::Entity::find_by_id(ping_id)
        .lock_exclusive()
        .one(&txn)
        .await?
    {
        Some(ping) if ping.gig_id == gig_id => ping,
        _ => return Ok(AcceptOutcome::Missing),
    };

    let claimed = gigs::Entity::update_many()
        .col_expr(gigs::Column::Status, Expr::value(GigStatus::Completed))
        .col_expr(
            gigs::Column::AcceptedApplicantId,
            Expr::value(ping.applicant_id),
        )
        .col_expr(gigs::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(gigs::Column::Id.eq(gig_id))
        .filter(gigs::Column::Status.eq(GigStatus::Active))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        let exists = gigs::Entity::find_by_id(gig_id).one(&txn).await?.is_some();
        txn.rollback().await?;
        return Ok(if exists {
            AcceptOutcome::GigNotActive
        } else {
            AcceptOutcome::Missing
        });
    }

    let mut active: pings::ActiveModel = ping.into();
    active.status = Set(PingStatus::Accepted);
    let ping = active.update(&txn).await?;

    let discarded = pings::Entity::delete_many()
        .filter(pings::Column::GigId.eq(gig_id))
        .filter(pings::Column::Id.ne(ping.id))
        .exec(&txn)
        .await?
        .rows_affected;

    let gig = gigs::Entity::find_by_id(gig_id)
        .one(&txn)
        .await?
        .ok_or(DbErr::RecordNotFound("Gig not found".to_string()))?;

    txn.commit().await?;

    Ok(AcceptOutcome::Accepted {
        ping,
        gig,
        discarded,
    })
}

pub async fn count_pings(db: &DatabaseConnection) -> Result<u64, DbErr> {
    pings::Entity::find().count(db).await
}
