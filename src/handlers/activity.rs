use actix_web::{HttpResponse, web};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/activity — public feed of recent postings and pings.
pub async fn recent(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let feed = state.activity.recent().await?;
    Ok(HttpResponse::Ok().json(feed))
}
