use actix_web::{HttpRequest, HttpResponse, web};

use crate::auth::Identity;
use crate::auth::middleware::MaybeUser;
use crate::error::AppError;
use crate::guard;
use crate::models::feedback::SubmitFeedback;
use crate::state::AppState;

/// POST /api/feedback — signed in or anonymous.
pub async fn submit_feedback(
    req: HttpRequest,
    user: MaybeUser,
    state: web::Data<AppState>,
    body: web::Json<SubmitFeedback>,
) -> Result<HttpResponse, AppError> {
    guard::admit(state.limiter.as_ref(), &req).await?;
    let sender = user.0.as_ref().map(Identity::from);
    let entry = state
        .feedback
        .submit(sender.as_ref(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(entry))
}
