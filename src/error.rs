//! Error types for the StudyShala server and its stores.
//!
//! [`AppError`] is the only error that crosses the HTTP boundary. Every variant
//! carries its own status code and a client-safe message; internal detail is
//! written to the log and never serialized into the response body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors raised by the user and session stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A principal with the same login identifier already exists
    #[error("identifier already registered: {0}")]
    Duplicate(String),

    /// The seed file could not be interpreted
    #[error("invalid seed data: {0}")]
    Seed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request-level error, converted to a JSON response at the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request's `Origin` is not on the allow-list
    #[error("origin not allowed by CORS policy: {origin}")]
    CorsRejected { origin: String },

    /// No valid session accompanies the request
    #[error("authentication required")]
    Unauthenticated,

    /// Login failed; which half of the credentials was wrong is not disclosed
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but the principal's role does not grant access
    #[error("access denied")]
    Forbidden,

    /// A named resource does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No route matched the request path
    #[error("route not found")]
    RouteNotFound,

    /// The request body or parameters are unusable
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with existing state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else; the detail stays in the log
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::CorsRejected { .. } | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::CorsRejected { .. } => "Not allowed by CORS".to_string(),
            AppError::Unauthenticated => "Authentication required".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::RouteNotFound => "Route not found".to_string(),
            AppError::BadRequest(message) | AppError::Conflict(message) => message.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else if matches!(self, AppError::CorsRejected { .. } | AppError::Forbidden) {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => {
                AppError::Conflict("Identifier already registered".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
