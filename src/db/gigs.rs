use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::gigs::{self, GigChanges, GigStatus, NewGig};
use crate::models::pings;
use crate::models::{StringList, page_offset};

/// Insert a new gig in the `active` state.
pub async fn insert_gig(db: &DatabaseConnection, input: NewGig) -> Result<gigs::Model, DbErr> {
    let now = Utc::now();
    let new_gig = gigs::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title),
        description: Set(input.description),
        created_by: Set(input.created_by),
        skills_required: Set(StringList(input.skills_required)),
        contact: Set(input.contact),
        display_contact_links: Set(input.display_contact_links),
        budget: Set(input.budget),
        status: Set(GigStatus::Active),
        expires_at: Set(input.expires_at),
        accepted_applicant_id: Set(None),
        report_count: Set(0),
        is_flagged: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_gig.insert(db).await
}

/// Fetch a single gig by ID.
pub async fn get_gig_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<gigs::Model>, DbErr> {
    gigs::Entity::find_by_id(id).one(db).await
}

/// Fetch every gig posted by `owner`, newest first.
pub async fn get_gigs_by_owner(
    db: &DatabaseConnection,
    owner: Uuid,
) -> Result<Vec<gigs::Model>, DbErr> {
    gigs::Entity::find()
        .filter(gigs::Column::CreatedBy.eq(owner))
        .order_by_desc(gigs::Column::CreatedAt)
        .all(db)
        .await
}

/// One page of the public listing: not expired and not completed, newest first.
pub async fn get_open_gigs(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    page: u64,
    page_size: u64,
) -> Result<(Vec<gigs::Model>, u64), DbErr> {
    let query = gigs::Entity::find()
        .filter(gigs::Column::ExpiresAt.gt(now))
        .filter(gigs::Column::Status.ne(GigStatus::Completed));

    let total = query.clone().count(db).await?;
    let items = query
        .order_by_desc(gigs::Column::CreatedAt)
        .order_by_desc(gigs::Column::Id)
        .offset(page_offset(page, page_size))
        .limit(page_size)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Apply field-level changes. Returns `None` when the gig does not exist.
pub async fn update_gig(
    db: &DatabaseConnection,
    id: Uuid,
    changes: GigChanges,
) -> Result<Option<gigs::Model>, DbErr> {
    let Some(gig) = gigs::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active: gigs::ActiveModel = gig.into();

    if let Some(title) = changes.title {
        active.title = Set(title);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(budget) = changes.budget {
        active.budget = Set(budget);
    }
    if let Some(expires_at) = changes.expires_at {
        active.expires_at = Set(expires_at);
    }
    if let Some(skills) = changes.skills_required {
        active.skills_required = Set(StringList(skills));
    }
    if let Some(contact) = changes.contact {
        active.contact = Set(contact);
    }
    if let Some(display) = changes.display_contact_links {
        active.display_contact_links = Set(display);
    }
    active.updated_at = Set(Utc::now());

    active.update(db).await.map(Some)
}

/// Move an `active` gig to `to`. Returns `false` when the gig was not active
/// (or does not exist), in which case nothing changed.
pub async fn transition_gig(
    db: &DatabaseConnection,
    id: Uuid,
    to: GigStatus,
) -> Result<bool, DbErr> {
    let result = gigs::Entity::update_many()
        .col_expr(gigs::Column::Status, Expr::value(to))
        .col_expr(gigs::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Active))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Expire every active gig whose deadline has passed. Returns the number of gigs changed.
pub async fn expire_overdue(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64, DbErr> {
    let result = gigs::Entity::update_many()
        .col_expr(gigs::Column::Status, Expr::value(GigStatus::Expired))
        .col_expr(gigs::Column::UpdatedAt, Expr::value(now))
        .filter(gigs::Column::ExpiresAt.lt(now))
        .filter(gigs::Column::Status.eq(GigStatus::Active))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete a gig together with its pings.
pub async fn delete_gig(db: &DatabaseConnection, id: Uuid) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    pings::Entity::delete_many()
        .filter(pings::Column::GigId.eq(id))
        .exec(&txn)
        .await?;
    let result = gigs::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(result.rows_affected > 0)
}

/// Record a report; the gig is flagged once `flag_threshold` reports accumulate.
pub async fn report_gig(
    db: &DatabaseConnection,
    id: Uuid,
    flag_threshold: i32,
) -> Result<Option<gigs::Model>, DbErr> {
    let txn = db.begin().await?;

    // Row lock serializes concurrent reports on the same gig.
    let Some(gig) = gigs::Entity::find_by_id(id)
        .lock_exclusive()
        .one(&txn)
        .await?
    else {
        txn.rollback().await?;
        return Ok(None);
    };

    let reports = gig.report_count + 1;
    let flagged = gig.is_flagged || reports >= flag_threshold;
    let mut active: gigs::ActiveModel = gig.into();
    active.report_count = Set(reports);
    active.is_flagged = Set(flagged);
    let gig = active.update(&txn).await?;

    txn.commit().await?;
    Ok(Some(gig))
}

pub async fn count_gigs(db: &DatabaseConnection) -> Result<u64, DbErr> {
    gigs::Entity::find().count(db).await
}

/// Flagged gigs, most reported first.
pub async fn get_flagged_gigs(db: &DatabaseConnection) -> Result<Vec<gigs::Model>, DbErr> {
    gigs::Entity::find()
        .filter(gigs::Column::IsFlagged.eq(true))
        .order_by_desc(gigs::Column::ReportCount)
        .all(db)
        .await
}
