use actix_web::{HttpResponse, web};

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::users::{CompleteProfile, UserResponse};
use crate::state::AppState;

/// GET /api/auth/me — return the currently authenticated user's profile.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(user.0))
}

/// POST /api/auth/complete-profile — set username, role, display_name after first login.
pub async fn complete_profile(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<CompleteProfile>,
) -> Result<HttpResponse, AppError> {
    let updated = state
        .profiles
        .complete(&user.identity(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}
