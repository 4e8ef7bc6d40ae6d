//! HTTP request handlers for the StudyShala API.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/login`, `POST /api/auth/logout`, `GET /api/auth/me`
//! - `GET /api/student/profile`
//! - `GET /api/faculty/profile`, `GET /api/faculty/students`
//! - `GET|POST /api/admin/users`, `GET|DELETE /api/admin/users/{id}`

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::{authenticate, hash_password, CurrentPrincipal, JsonBody, Session};
use crate::config::Environment;
use crate::error::AppError;
use crate::session::{Clock, CookiePolicy, CookieSigner, SessionStore, SystemClock};
use crate::store::{NewPrincipal, PrincipalView, Role, UserStore};

/// Minimum length of a password set through the admin API.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Application State
// =============================================================================

/// Service handles shared by every handler.
///
/// Built once at startup and cloned per request; all members are cheap to
/// clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub signer: CookieSigner,
    pub cookie: CookiePolicy,
    pub clock: Arc<dyn Clock>,
    pub environment: Environment,
}

impl AppState {
    /// Create application state using the system clock.
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_secret: impl AsRef<[u8]>,
        environment: Environment,
    ) -> Self {
        Self {
            users,
            sessions,
            signer: CookieSigner::new(session_secret),
            cookie: CookiePolicy::for_environment(environment),
            clock: Arc::new(SystemClock),
            environment,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

// =============================================================================
// Request and Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `OK`
    pub status: String,

    /// `production` or `development`
    pub environment: String,

    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,

    /// Signed session value, usable as a bearer token
    pub token: String,

    pub user: PrincipalView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PrincipalView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<PrincipalView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default, alias = "email")]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        environment: state.environment.to_string(),
        timestamp: state
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `POST /api/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if body.identifier.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Identifier and password are required".to_string(),
        ));
    }

    let principal = authenticate(state.users.as_ref(), &body.identifier, &body.password).await?;
    let token = session.establish(&principal).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: PrincipalView::from(&principal),
    }))
}

/// `POST /api/auth/logout`
pub async fn logout_handler(session: Session) -> Result<Json<MessageResponse>, AppError> {
    session.end().await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Current principal. Serves `GET /api/auth/me` and the role-scoped profiles.
pub async fn me_handler(CurrentPrincipal(principal): CurrentPrincipal) -> Json<UserResponse> {
    Json(UserResponse {
        user: PrincipalView::from(&principal),
    })
}

/// `GET /api/faculty/students`
pub async fn faculty_students_handler(
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, AppError> {
    let students = state.users.list(Some(Role::Student)).await?;
    Ok(Json(UsersResponse {
        users: students.iter().map(PrincipalView::from).collect(),
    }))
}

/// `GET /api/admin/users[?role=student|faculty|admin]`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    let role = match query.role.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Role>().map_err(AppError::BadRequest)?),
    };

    let users = state.users.list(role).await?;
    Ok(Json(UsersResponse {
        users: users.iter().map(PrincipalView::from).collect(),
    }))
}

/// `POST /api/admin/users`
pub async fn create_user_handler(
    State(state): State<AppState>,
    CurrentPrincipal(admin): CurrentPrincipal,
    JsonBody(body): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if body.identifier.trim().is_empty()
        || body.name.trim().is_empty()
        || body.password.is_empty()
        || body.role.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Identifier, name, password and role are required".to_string(),
        ));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let role = body.role.parse::<Role>().map_err(AppError::BadRequest)?;

    let password_hash = hash_password(body.password).await?;
    let created = state
        .users
        .insert(NewPrincipal {
            identifier: body.identifier,
            name: body.name,
            role,
            password_hash,
        })
        .await?;

    info!(
        admin_id = %admin.id,
        principal_id = %created.id,
        role = %created.role,
        "Principal created"
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: PrincipalView::from(&created),
        }),
    ))
}

/// `GET /api/admin/users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let principal = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(UserResponse {
        user: PrincipalView::from(&principal),
    }))
}

/// `DELETE /api/admin/users/{id}`
///
/// Sessions held by the removed principal stop resolving on their next use.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    CurrentPrincipal(admin): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if admin.id == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    if !state.users.remove(&id).await? {
        return Err(AppError::NotFound("User"));
    }

    info!(admin_id = %admin.id, principal_id = %id, "Principal deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}

// =============================================================================
// Tests
// =============================================================================
