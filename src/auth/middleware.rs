use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use std::future::Future;
use std::pin::Pin;

use crate::auth::Identity;
use crate::error::AppError;
use crate::models::users::{self, CreateUserFromAuth, Roles};
use crate::state::AppState;

/// Extractor for routes that require a signed-in, non-banned user.
pub struct AuthenticatedUser(pub users::Model);

impl AuthenticatedUser {
    pub fn identity(&self) -> Identity {
        Identity::from(&self.0)
    }
}

/// Extractor for routes open to anonymous callers. A present but invalid
/// token is still rejected.
pub struct MaybeUser(pub Option<users::Model>);

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(header) = req.headers().get("Authorization") else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Malformed Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or_else(|| {
            AppError::Unauthenticated("Authorization header must be: Bearer <token>".to_string())
        })
}

async fn resolve_user(req: &HttpRequest, token: &str) -> Result<users::Model, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state not configured".to_string()))?;

    // 1. Validate the JWT.
    let claims = state
        .verifier
        .verify(token)
        .await
        .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {e}")))?;

    // 2. Extract user info from claims.
    let user_id = claims
        .user_id()
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;
    let email = claims
        .user_email()
        .ok_or_else(|| AppError::Unauthenticated("No email in token claims".to_string()))?;

    // 3. Find or create the user.
    let user = state
        .store
        .find_or_create_user(CreateUserFromAuth {
            id: user_id,
            email,
            display_name: claims.display_name(),
            avatar_url: claims.avatar_url(),
            auth_provider: "google".to_string(),
            role: Roles::Client, // default role for new users
        })
        .await?;

    if user.is_banned {
        return Err(AppError::forbidden("This account has been suspended"));
    }

    Ok(user)
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let token = bearer_token(&req)?.ok_or_else(|| {
                AppError::Unauthenticated("Missing Authorization header".to_string())
            })?;
            resolve_user(&req, &token).await.map(AuthenticatedUser)
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            match bearer_token(&req)? {
                Some(token) => resolve_user(&req, &token).await.map(|u| MaybeUser(Some(u))),
                None => Ok(MaybeUser(None)),
            }
        })
    }
}
