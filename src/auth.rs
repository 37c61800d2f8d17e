use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// `true` iff `header` is exactly `Bearer <secret>`.
pub fn is_authorized(header: Option<&str>, secret: &str) -> bool {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|token| token == secret)
}

/// The shared admin secret, fixed for the lifetime of the process.
#[derive(Clone)]
pub struct AdminSecret {
    secret: Arc<str>,
}

impl AdminSecret {
    pub fn new(secret: &str) -> Self {
        if secret == DEFAULT_ADMIN_PASSWORD {
            warn!("ADMIN_PASSWORD not set, using the built-in default");
        } else {
            info!("admin secret configured");
        }

        Self {
            secret: Arc::from(secret),
        }
    }

    pub fn is_valid(&self, header: Option<&str>) -> bool {
        is_authorized(header, &self.secret)
    }
}

pub async fn require_auth(
    State(secret): State<AdminSecret>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if secret.is_valid(auth_header) {
        Ok(next.run(request).await)
    } else {
        info!(path = %request.uri().path(), "rejected request: bad or missing token");
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_bearer_match() {
        assert!(is_authorized(Some("Bearer s3cret"), "s3cret"));
    }

    #[test]
    fn test_rejects_near_misses() {
        assert!(!is_authorized(None, "s3cret"));
        assert!(!is_authorized(Some(""), "s3cret"));
        assert!(!is_authorized(Some("s3cret"), "s3cret"));
        assert!(!is_authorized(Some("bearer s3cret"), "s3cret"));
        assert!(!is_authorized(Some("Bearer  s3cret"), "s3cret"));
        assert!(!is_authorized(Some("Bearer s3cret "), "s3cret"));
        assert!(!is_authorized(Some("Bearer S3CRET"), "s3cret"));
        assert!(!is_authorized(Some("Basic s3cret"), "s3cret"));
    }

    #[test]
    fn test_default_secret() {
        let secret = AdminSecret::new(DEFAULT_ADMIN_PASSWORD);
        assert!(secret.is_valid(Some("Bearer admin123")));
        assert!(!secret.is_valid(Some("Bearer admin1234")));
    }
}
