//! Admission control.
//!
//! Handlers call [`admit`] for the endpoints they want throttled; ownership
//! checks live in [`crate::auth::authorization`].

pub mod rate_limit;

use actix_web::HttpRequest;
use tracing::warn;

use crate::error::{AppError, AppResult};

pub use rate_limit::{Admission, FixedWindow, MemoryRateLimiter, RateLimiter, RedisRateLimiter};

/// Client network origin used as the rate-limit key.
pub fn client_origin(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .map(|addr| {
            // Strip the port so every connection from one host shares a window.
            addr.parse::<std::net::SocketAddr>()
                .map(|sock| sock.ip().to_string())
                .unwrap_or_else(|_| addr.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Charge one call to the caller's window. Limiter failures fail open.
pub async fn admit(limiter: &dyn RateLimiter, req: &HttpRequest) -> AppResult<()> {
    let origin = client_origin(req);
    match limiter.admit(&origin).await {
        Ok(Admission::Allowed { .. }) => Ok(()),
        Ok(Admission::Denied { retry_after }) => {
            warn!(
                origin = %origin,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited { retry_after })
        }
        Err(e) => {
            warn!(origin = %origin, error = %e, "Rate limiter unavailable, admitting request");
            Ok(())
        }
    }
}
