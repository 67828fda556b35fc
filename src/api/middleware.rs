//! Bearer-token authentication for the API.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::service::NoteService;

/// Security settings derived from [`ServerConfig`](crate::config::ServerConfig).
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Allowed CORS origins (from NOTEWELL_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    pub fn from_server_config(config: &crate::config::ServerConfig) -> Self {
        Self {
            cors_origins: config.cors_origins.clone(),
        }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
        }
    }
}

/// Resolve the bearer token to a user and attach it to the request as a
/// [`CurrentUser`](crate::models::CurrentUser) extension. Unknown or missing
/// tokens are rejected with 401.
pub async fn auth_middleware(
    State(service): State<NoteService>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&request).ok_or_else(|| {
        tracing::warn!("Missing or malformed Authorization header");
        StatusCode::UNAUTHORIZED
    })?;

    let user = service
        .authenticate(token)
        .map_err(|e| {
            tracing::error!("Token lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            tracing::warn!("Unknown API token");
            StatusCode::UNAUTHORIZED
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/notes");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        let request = request_with(Some("Bearer abc123"));
        assert_eq!(bearer_token(&request), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes() {
        let request = request_with(Some("Basic abc123"));
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn rejects_empty_token() {
        let request = request_with(Some("Bearer "));
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn rejects_missing_header() {
        let request = request_with(None);
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn security_config_default_allows_any_origin() {
        let config = SecurityConfig::default();
        assert!(config.cors_origins.is_none());
    }
}
