//! Router configuration for the StudyShala API.
//!
//! # Route Structure
//!
//! ```text
//! /api/health                  - Health check (public)
//! /api/auth/login              - POST, start a session (public)
//! /api/auth/logout             - POST, end the session (public)
//! /api/auth/me                 - GET, current principal (any role)
//! /api/student/profile         - GET (student)
//! /api/faculty/profile         - GET (faculty)
//! /api/faculty/students        - GET (faculty)
//! /api/admin/users             - GET, POST (admin)
//! /api/admin/users/{id}        - GET, DELETE (admin)
//! ```
//!
//! # Middleware Order
//!
//! Outermost first:
//!
//! ```text
//! TraceLayer → cors_gate → CorsLayer → CatchPanicLayer → session_middleware
//!     → [role_guard] → handler | route_not_found
//! ```

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::auth::{role_guard, session_middleware};
use super::boundary::{panic_response, route_not_found};
use super::cors::{cors_gate, cors_layer, CorsPolicy};
use super::handlers::{
    create_user_handler, delete_user_handler, faculty_students_handler, get_user_handler,
    health_handler, list_users_handler, login_handler, logout_handler, me_handler, AppState,
};
use crate::store::Role;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Origins admitted by the CORS gate
    pub cors: CorsPolicy,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Default origins plus an optional frontend URL, tracing enabled.
    pub fn new(frontend_url: Option<&str>) -> Self {
        Self {
            cors: CorsPolicy::from_frontend_url(frontend_url),
            enable_tracing: true,
        }
    }

    /// Replace the CORS policy.
    pub fn with_cors_policy(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Route groups under `/api`, without the boundary layers.
pub fn api_routes() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler));

    let student_routes = Router::new()
        .route("/profile", get(me_handler))
        .route_layer(middleware::from_fn_with_state(Role::Student, role_guard));

    let faculty_routes = Router::new()
        .route("/profile", get(me_handler))
        .route("/students", get(faculty_students_handler))
        .route_layer(middleware::from_fn_with_state(Role::Faculty, role_guard));

    let admin_routes = Router::new()
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route("/users/{id}", get(get_user_handler).delete(delete_user_handler))
        .route_layer(middleware::from_fn_with_state(Role::Admin, role_guard));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/auth", auth_routes)
        .nest("/student", student_routes)
        .nest("/faculty", faculty_routes)
        .nest("/admin", admin_routes)
}

/// Create the main application router.
///
/// Wraps [`api_routes`] in the session, panic, CORS and tracing layers and
/// installs the JSON 404 fallback.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    build_router(api_routes(), state, config)
}

/// Mount `api` under `/api` behind the full middleware stack.
pub fn build_router(api: Router<AppState>, state: AppState, config: RouterConfig) -> Router {
    let router = Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&config.cors))
        .layer(middleware::from_fn_with_state(config.cors, cors_gate))
        .with_state(state);

    if config.enable_tracing {
        // Requests are logged at info.
        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
    } else {
        router
    }
}
