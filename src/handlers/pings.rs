use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::guard;
use crate::models::pings::{AcceptPing, PingedResponse, SubmitPing};
use crate::state::AppState;

/// POST /api/pings — apply to a gig.
pub async fn submit_ping(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<SubmitPing>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let ping = state.pings.submit(&user.identity(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ping))
}

/// GET /api/pings/mine
pub async fn my_pings(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let pings = state.pings.list_mine(&user.identity()).await?;
    Ok(HttpResponse::Ok().json(pings))
}

/// GET /api/pings/check/{gig_id}
pub async fn check_pinged(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pinged = state
        .pings
        .check_pinged(user.0.id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(PingedResponse { pinged }))
}

/// GET /api/pings/gig/{gig_id} — applicants for the owner's gig.
pub async fn gig_pings(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let pings = state
        .pings
        .fetch_for_gig(path.into_inner(), &user.identity())
        .await?;
    Ok(HttpResponse::Ok().json(pings))
}

/// POST /api/pings/{id}/accept
pub async fn accept_ping(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AcceptPing>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let acceptance = state
        .pings
        .accept(path.into_inner(), body.gig_id, &user.identity())
        .await?;
    Ok(HttpResponse::Ok().json(acceptance))
}

/// DELETE /api/pings/{id} — owner rejection or applicant withdrawal.
pub async fn reject_ping(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let id = path.into_inner();
    state.pings.reject(id, &user.identity()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Ping {id} removed"),
    })))
}
