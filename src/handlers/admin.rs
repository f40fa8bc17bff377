use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub banned: bool,
}

/// GET /api/admin/overview
pub async fn overview(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let overview = state.admin.overview(&user.identity()).await?;
    Ok(HttpResponse::Ok().json(overview))
}

/// GET /api/admin/users?page=1&limit=20
pub async fn list_users(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let users = state
        .admin
        .list_users(&user.identity(), query.page(), query.limit())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/admin/feedback?limit=50
pub async fn feedback(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let entries = state.admin.feedback(&user.identity(), query.limit()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// DELETE /api/admin/gigs/{id}
pub async fn delete_gig(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    state.gigs.admin_delete(id, &user.identity()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Gig {id} deleted"),
    })))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    state.admin.delete_user(&user.identity(), id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("User {id} deleted"),
    })))
}

/// PUT /api/admin/users/{id}/ban
pub async fn set_ban(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<BanRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = state
        .admin
        .set_banned(&user.identity(), path.into_inner(), body.banned)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}
