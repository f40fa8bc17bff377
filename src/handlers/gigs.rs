use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::guard;
use crate::models::PaginationQuery;
use crate::models::gigs::{ContactVisibility, CreateGig, UpdateGig};
use crate::state::AppState;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// GET /api/gigs?page=1&limit=20 — open gigs, newest first.
pub async fn list_gigs(
    state: web::Data<AppState>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state.gigs.read_listing(query.page(), query.limit()).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/gigs — create a new gig (requires authentication).
pub async fn create_gig(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<CreateGig>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let gig = state.gigs.create(&user.identity(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(gig))
}

/// GET /api/gigs/mine — the caller's own gigs.
pub async fn my_gigs(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let gigs = state.gigs.list_by_owner(user.0.id).await?;
    Ok(HttpResponse::Ok().json(gigs))
}

/// GET /api/gigs/{id}
pub async fn get_gig(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let gig = state.gigs.read_gig(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(gig))
}

/// PUT /api/gigs/{id} — owner edit, including archive/expire.
pub async fn update_gig(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateGig>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let gig = state
        .gigs
        .edit(path.into_inner(), &user.identity(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(gig))
}

/// DELETE /api/gigs/{id} — owner delete; also removes the gig's pings.
pub async fn delete_gig(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let id = path.into_inner();
    state.gigs.delete(id, &user.identity()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Gig {id} deleted"),
    })))
}

/// PUT /api/gigs/{id}/contact-visibility
pub async fn set_contact_visibility(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ContactVisibility>,
) -> Result<HttpResponse, AppError> {
    let gig = state
        .gigs
        .toggle_contact_visibility(
            path.into_inner(),
            &user.identity(),
            body.display_contact_links,
        )
        .await?;
    Ok(HttpResponse::Ok().json(gig))
}

/// POST /api/gigs/{id}/report
pub async fn report_gig(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    state.gigs.report(path.into_inner(), &user.identity()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Report received" })))
}

/// POST /api/gigs/expire — external cron trigger for the expiry sweep.
pub async fn expire_gigs(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let Some(expected) = state.cron_secret.as_deref() else {
        return Err(AppError::forbidden("Expiry endpoint is disabled"));
    };
    let provided = req
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return Err(AppError::Unauthenticated("Invalid cron secret".to_string()));
    }

    let report = state.gigs.expire_sweep().await?;
    Ok(HttpResponse::Ok().json(report))
}
