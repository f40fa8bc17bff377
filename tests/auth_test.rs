//! Token verification without a server, database or JWKS endpoint.
//!
//! Tokens are minted locally with HS256 and checked through both
//! `validate_with_secret` and the `TokenVerifier` the extractor uses.
//!
//! Run with: `cargo test --test auth_test`
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use gigboard_backend::auth::jwt::{Claims, TokenVerifier, UserMetadata, validate_with_secret};

const SECRET: &str = "auth-test-secret-long-enough-for-hs256-signing-xxxx";

fn claims_for(sub: &str, exp_offset_secs: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: sub.to_string(),
        exp: (now + exp_offset_secs) as usize,
        iat: Some(now as usize),
        iss: None,
        email: None,
        role: Some("authenticated".to_string()),
        user_metadata: None,
    }
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode test JWT")
}

#[test]
fn metadata_fills_profile_helpers() {
    let user_id = Uuid::new_v4();
    let mut claims = claims_for(&user_id.to_string(), 3600);
    claims.email = Some("top-level@example.com".to_string());
    claims.user_metadata = Some(UserMetadata {
        full_name: None,
        name: Some("Dana Reyes".to_string()),
        avatar_url: None,
        picture: Some("https://img.example.com/dana.png".to_string()),
        email: Some("dana@example.com".to_string()),
        email_verified: Some(true),
    });

    let decoded =
        validate_with_secret(&sign(&claims, SECRET), SECRET).expect("Token should be valid");

    assert_eq!(decoded.user_id().unwrap(), user_id);
    assert_eq!(decoded.display_name().unwrap(), "Dana Reyes");
    assert_eq!(decoded.avatar_url().unwrap(), "https://img.example.com/dana.png");
    assert_eq!(decoded.user_email().unwrap(), "top-level@example.com");
}

#[test]
fn bare_claims_fall_back_to_top_level_email() {
    let mut claims = claims_for(&Uuid::new_v4().to_string(), 3600);
    claims.email = Some("bare@example.com".to_string());

    assert_eq!(claims.user_email().unwrap(), "bare@example.com");
    assert!(claims.display_name().is_none());
    assert!(claims.avatar_url().is_none());
}

#[test]
fn expired_token_is_rejected() {
    // Past the default 60s leeway.
    let token = sign(&claims_for(&Uuid::new_v4().to_string(), -300), SECRET);

    let err = validate_with_secret(&token, SECRET).unwrap_err();
    assert!(err.to_string().contains("ExpiredSignature"));
}

#[test]
fn foreign_signature_is_rejected() {
    let claims = claims_for(&Uuid::new_v4().to_string(), 3600);
    let token = sign(&claims, "someone-elses-secret-xxxxxxxxxxxxxxxxxxx");

    let err = validate_with_secret(&token, SECRET).unwrap_err();
    assert!(err.to_string().contains("InvalidSignature"));
    assert!(validate_with_secret("not.a.valid.jwt", SECRET).is_err());
}

#[test]
fn subject_must_be_a_uuid() {
    let claims = claims_for("service-account", 3600);
    assert!(claims.user_id().is_err());
    assert!(claims.user_email().is_none());
}

#[tokio::test]
async fn shared_secret_verifier_checks_signature() {
    let user_id = Uuid::new_v4();
    let token = sign(&claims_for(&user_id.to_string(), 3600), SECRET);

    let verifier = TokenVerifier::SharedSecret(SECRET.to_string());
    let claims = verifier.verify(&token).await.expect("Token should be valid");
    assert_eq!(claims.user_id().unwrap(), user_id);

    let other =
        TokenVerifier::SharedSecret("another-secret-xxxxxxxxxxxxxxxxxxxxxxxxxxxx".to_string());
    assert!(other.verify(&token).await.is_err());
}
