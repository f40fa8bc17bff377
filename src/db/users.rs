use sea_orm::*;
use uuid::Uuid;

use crate::models::users::{self, CompleteProfile, CreateUserFromAuth, UpdateProfile};
use crate::models::{ContactLinks, StringList, page_offset};

/// Create a new user from Supabase Auth JWT claims (called by auth middleware).
pub async fn find_or_create_from_auth(
    db: &DatabaseConnection,
    input: CreateUserFromAuth,
) -> Result<users::Model, DbErr> {
    // Try to find the user first (by Supabase auth UUID).
    if let Some(existing) = users::Entity::find_by_id(input.id).one(db).await? {
        return Ok(existing);
    }

    // User doesn't exist yet — create from JWT claims.
    let new_user = users::ActiveModel {
        id: Set(input.id),
        email: Set(input.email),
        username: Set(None),
        display_name: Set(input.display_name),
        avatar_url: Set(input.avatar_url),
        auth_provider: Set(input.auth_provider),
        role: Set(input.role),
        activity_public: Set(true),
        bio: Set(None),
        skills: Set(StringList::default()),
        location: Set(None),
        contact_links: Set(ContactLinks::default()),
        report_count: Set(0),
        is_banned: Set(false),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_user.insert(db).await
}

/// Fetch one page of users, oldest first.
pub async fn get_users_paginated(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .order_by_asc(users::Column::CreatedAt)
        .offset(page_offset(page, limit))
        .limit(limit)
        .all(db)
        .await
}

/// Fetch a single user by ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

/// Complete a user's profile (set username, role, display_name after first login).
pub async fn complete_profile(
    db: &DatabaseConnection,
    id: Uuid,
    input: CompleteProfile,
) -> Result<Option<users::Model>, DbErr> {
    let Some(user) = users::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active: users::ActiveModel = user.into();

    if let Some(username) = input.username {
        active.username = Set(Some(username));
    }
    if let Some(role) = input.role {
        active.role = Set(role);
    }
    if let Some(display_name) = input.display_name {
        active.display_name = Set(Some(display_name));
    }
    if let Some(avatar_url) = input.avatar_url {
        active.avatar_url = Set(Some(avatar_url));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await.map(Some)
}

/// Apply a self-service profile edit.
pub async fn update_profile(
    db: &DatabaseConnection,
    id: Uuid,
    input: UpdateProfile,
) -> Result<Option<users::Model>, DbErr> {
    let Some(user) = users::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active: users::ActiveModel = user.into();

    if let Some(username) = input.username {
        active.username = Set(Some(username));
    }
    if let Some(display_name) = input.display_name {
        active.display_name = Set(Some(display_name));
    }
    if let Some(avatar_url) = input.avatar_url {
        active.avatar_url = Set(Some(avatar_url));
    }
    if let Some(bio) = input.bio {
        active.bio = Set(Some(bio));
    }
    if let Some(skills) = input.skills {
        active.skills = Set(StringList(skills));
    }
    if let Some(location) = input.location {
        active.location = Set(Some(location));
    }
    if let Some(links) = input.contact_links {
        active.contact_links = Set(links);
    }
    if let Some(public) = input.activity_public {
        active.activity_public = Set(public);
    }
    if let Some(role) = input.role {
        active.role = Set(role);
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await.map(Some)
}

/// Ban or unban a user.
pub async fn set_banned(
    db: &DatabaseConnection,
    id: Uuid,
    banned: bool,
) -> Result<Option<users::Model>, DbErr> {
    let Some(user) = users::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let mut active: users::ActiveModel = user.into();
    active.is_banned = Set(banned);
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await.map(Some)
}

/// Delete a user by ID.
pub async fn delete_user(db: &DatabaseConnection, id: Uuid) -> Result<bool, DbErr> {
    let result = users::Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

pub async fn count_users(db: &DatabaseConnection) -> Result<u64, DbErr> {
    users::Entity::find().count(db).await
}
