use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode, decode_header};
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use super::jwt::{AuthError, Claims};

const JWKS_URL_TEMPLATE: &str = "https://{}.supabase.co/auth/v1/.well-known/jwks.json";

#[derive(Clone)]
struct JwksKeyData {
    x: String,
    y: String,
    algorithm: Algorithm,
}

/// Supabase signing keys, fetched lazily by `kid` and kept for an hour.
#[derive(Clone)]
pub struct JwksCache {
    cache: Arc<Cache<String, JwksKeyData>>,
    jwks_url: String,
    client: reqwest::Client,
    anon_key: String,
}

impl JwksCache {
    pub fn new(project_ref: &str, anon_key: &str) -> Self {
        let client = reqwest::Client::new();
        let cache = Arc::new(
            Cache::builder()
                .time_to_live(std::time::Duration::from_secs(3600))
                .max_capacity(10)
                .build(),
        );

        Self {
            cache,
            jwks_url: JWKS_URL_TEMPLATE.replace("{}", project_ref),
            client,
            anon_key: anon_key.to_string(),
        }
    }

    async fn fetch_jwks(&self) -> Result<serde_json::Value, AuthError> {
        debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetch(format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("invalid JWKS JSON: {e}")))
    }

    async fn get_key_data(&self, kid: &str) -> Result<JwksKeyData, AuthError> {
        if let Some(cached) = self.cache.get(kid).await {
            return Ok(cached);
        }

        let jwks = self.fetch_jwks().await?;
        let keys = jwks["keys"]
            .as_array()
            .ok_or_else(|| AuthError::KeyFetch("no keys in JWKS".to_string()))?;

        let key = keys
            .iter()
            .find(|k| k["kid"].as_str() == Some(kid))
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))?;

        let component = |name: &str| {
            key[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| AuthError::KeyFetch(format!("missing '{name}' in JWK")))
        };

        let algorithm = match key["alg"].as_str() {
            Some("ES384") => Algorithm::ES384,
            _ => Algorithm::ES256,
        };

        let key_data = JwksKeyData {
            x: component("x")?,
            y: component("y")?,
            algorithm,
        };

        self.cache.insert(kid.to_string(), key_data.clone()).await;
        Ok(key_data)
    }

    pub async fn validate_token(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        let header = decode_header(token).map_err(AuthError::Invalid)?;
        let kid = header.kid.ok_or(AuthError::MissingKid)?;

        let key_data = self.get_key_data(&kid).await?;

        let decoding_key = DecodingKey::from_ec_components(&key_data.x, &key_data.y)
            .map_err(AuthError::Invalid)?;

        let mut validation = Validation::new(key_data.algorithm);
        validation.validate_aud = false;

        decode::<Claims>(token, &decoding_key, &validation).map_err(AuthError::Invalid)
    }
}
