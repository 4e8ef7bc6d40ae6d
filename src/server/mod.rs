//! HTTP server layer for StudyShala.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                             │
//! │                 /api/{health,auth,student,faculty,admin}        │
//! │                                                                 │
//! │  ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌────────────────┐  │
//! │  │   cors   │  │   auth   │  │ handlers  │  │    routes      │  │
//! │  │  (gate)  │  │(sessions)│  │ (requests)│  │ (router config)│  │
//! │  └──────────┘  └──────────┘  └───────────┘  └────────────────┘  │
//! │                        boundary (404 / errors / panics)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod boundary;
pub mod cors;
pub mod handlers;
pub mod routes;

pub use auth::{
    authenticate, hash_password, hash_password_blocking, role_guard, session_middleware,
    verify_password, verify_password_blocking, CurrentPrincipal, JsonBody, Session,
};
pub use boundary::{panic_response, route_not_found, Outcome};
pub use cors::{cors_gate, cors_layer, CorsPolicy, DEFAULT_ALLOWED_ORIGINS};
pub use handlers::{
    AppState, HealthResponse, LoginResponse, MessageResponse, UserResponse, UsersResponse,
};
pub use routes::{api_routes, build_router, create_router, RouterConfig};
