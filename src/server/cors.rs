//! Cross-origin policy.
//!
//! Two pieces work together:
//!
//! - [`cors_gate`] refuses requests whose `Origin` is not on the allow-list
//!   with 403 before any route runs.
//! - [`cors_layer`] answers preflights and adds the
//!   `Access-Control-Allow-*` headers (with credentials) for allowed origins.
//!
//! Requests without an `Origin` header (same-origin navigation, curl, server
//! to server) are always admitted.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::boundary::Outcome;
use crate::error::AppError;

/// Local development origins that are always allowed.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// Preflight cache lifetime.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Ordered, immutable list of permitted origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    origins: Arc<Vec<String>>,
}

impl CorsPolicy {
    /// Build a policy from an explicit list. Duplicates are dropped, order kept.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.into();
            if !origin.is_empty() && !unique.contains(&origin) {
                unique.push(origin);
            }
        }
        Self {
            origins: Arc::new(unique),
        }
    }

    /// The local development origins plus the deployed frontend, if any.
    pub fn from_frontend_url(frontend_url: Option<&str>) -> Self {
        let frontend = frontend_url.map(|u| u.trim().trim_end_matches('/').to_string());
        Self::new(
            DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .chain(frontend),
        )
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Allow/deny decision for a request's declared origin.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.origins.iter().any(|o| o == origin),
        }
    }
}

/// Reject requests from origins that are not on the allow-list.
pub async fn cors_gate(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Outcome {
    if let Some(value) = request.headers().get(header::ORIGIN) {
        let origin = value.to_str().ok();
        if origin.is_none() || !policy.is_allowed(origin) {
            return Outcome::Error(AppError::CorsRejected {
                origin: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            });
        }
    }

    Outcome::Handled(next.run(request).await)
}

/// Response-header side of the policy.
pub fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    let origins: Vec<HeaderValue> = policy
        .origins()
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(PREFLIGHT_MAX_AGE)
}
