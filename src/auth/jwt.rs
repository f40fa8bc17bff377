use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::jwks::JwksCache;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token validation failed: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("No 'kid' in token header")]
    MissingKid,

    #[error("Key with kid={0} not found in JWKS")]
    UnknownKey(String),

    #[error("Failed to fetch JWKS: {0}")]
    KeyFetch(String),

    #[error("Invalid claims: {0}")]
    Claims(String),
}

/// Supabase JWT claims.
///
/// The `sub` field is the user's UUID in `auth.users`.
/// `user_metadata` contains profile info from the OAuth provider (Google).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The Supabase auth user UUID.
    pub sub: String,
    /// Token expiration (Unix timestamp).
    pub exp: usize,
    /// Token issued-at (Unix timestamp).
    pub iat: Option<usize>,
    /// Issuer, the Supabase URL + `/auth/v1`.
    pub iss: Option<String>,
    /// User's email from Supabase auth.
    pub email: Option<String>,
    /// Supabase role (e.g. "authenticated").
    pub role: Option<String>,
    /// Metadata from the OAuth provider.
    pub user_metadata: Option<UserMetadata>,
}

/// Metadata populated by the OAuth provider (Google).
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub picture: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

impl Claims {
    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::Claims(format!("invalid UUID in sub claim: {e}")))
    }

    /// Best-effort display name from metadata.
    pub fn display_name(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.full_name.clone().or_else(|| m.name.clone()))
    }

    /// Best-effort avatar URL from metadata.
    pub fn avatar_url(&self) -> Option<String> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.avatar_url.clone().or_else(|| m.picture.clone()))
    }

    /// Best-effort email: prefer top-level, fall back to metadata.
    pub fn user_email(&self) -> Option<String> {
        self.email
            .clone()
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.email.clone()))
    }
}

/// How bearer tokens are checked.
#[derive(Clone)]
pub enum TokenVerifier {
    /// ES256/ES384 keys from the project's JWKS endpoint.
    Jwks(Arc<JwksCache>),
    /// HS256 with the project's shared JWT secret.
    SharedSecret(String),
}

impl TokenVerifier {
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        match self {
            TokenVerifier::Jwks(jwks) => jwks.validate_token(token).await.map(|td| td.claims),
            TokenVerifier::SharedSecret(secret) => validate_with_secret(token, secret),
        }
    }
}

/// Validate an HS256 Supabase JWT with the shared secret.
pub fn validate_with_secret(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|td| td.claims)
    .map_err(AuthError::Invalid)
}
