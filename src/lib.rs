//! # StudyShala
//!
//! Session-authenticated REST API for the StudyShala student, faculty and
//! admin portals, plus a client that mirrors the web frontend's API wrapper.
//!
//! ## Features
//!
//! - **CORS gate**: exact-match origin allow-list, credentials only for allowed origins
//! - **Server-side sessions**: HMAC-signed `studyshala.sid` cookie or bearer token, 24h lifetime
//! - **Local credentials**: Argon2id password hashes, role-scoped route groups
//! - **Uniform errors**: every failure is `{"message": ...}`, internals stay in the log
//!
//! ## Architecture
//!
//! - [`store`] - Principals and the user store trait
//! - [`session`] - Session records, the session store trait and cookie signing
//! - [`server`] - Axum router, middleware and handlers
//! - [`client`] - HTTP client with bearer injection and 401 handling
//! - [`config`] - CLI and configuration types
//! - [`logging`] - Console and file logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studyshala::{create_router, AppState, Environment, MemorySessionStore, MemoryUserStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(
//!         Arc::new(MemoryUserStore::new()),
//!         Arc::new(MemorySessionStore::new()),
//!         "change-me",
//!         Environment::Development,
//!     );
//!     let router = create_router(state, RouterConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use client::{ApiClient, ClientError, FileTokenStore, MemoryTokenStore, Navigator, TokenStore};
pub use config::{Cli, Command, ConfigError, Environment, ServeConfig};
pub use error::{AppError, ErrorBody, StoreError};
pub use server::{create_router, AppState, CorsPolicy, RouterConfig};
pub use session::{
    Clock, CookiePolicy, CookieSigner, MemorySessionStore, SessionRecord, SessionStore,
    SystemClock, SESSION_COOKIE_NAME, SESSION_TTL_SECS,
};
pub use store::{MemoryUserStore, NewPrincipal, Principal, PrincipalView, Role, UserStore};
