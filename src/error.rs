//! Request-level error taxonomy.
//!
//! Every service operation returns [`AppError`]; actix renders it through
//! [`ResponseError`] as `{"error": "..."}` with the matching status code.

use actix_web::http::StatusCode;
use actix_web::http::header::RETRY_AFTER;
use actix_web::{HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// No verified identity on the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Verified identity without rights over the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent, e.g. `NotFound("Gig", id)`.
    #[error("{0} {1} not found")]
    NotFound(&'static str, String),

    /// The resource is in a state that does not allow the operation.
    #[error("{0}")]
    Conflict(String),

    #[error("too many requests, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound(entity, id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut builder = HttpResponse::build(status);
        if let AppError::RateLimited { retry_after } = self {
            builder.insert_header((RETRY_AFTER, retry_after.as_secs().max(1).to_string()));
        }
        builder.json(serde_json::json!({ "error": message }))
    }
}

pub type AppResult<T> = Result<T, AppError>;
