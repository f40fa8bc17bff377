use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::guard;
use crate::models::users::UpdateProfile;
use crate::state::AppState;

/// GET /api/users/{id} — get a single user (requires authentication).
pub async fn get_user(
    _user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let profile = state.profiles.fetch(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /api/users/{id} — edit your own profile.
pub async fn update_user(
    req: HttpRequest,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProfile>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let profile = state
        .profiles
        .edit(path.into_inner(), &user.identity(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}
