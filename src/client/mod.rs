//! HTTP client for the StudyShala API.
//!
//! The client behaves like the web frontend's API wrapper:
//!
//! - every request carries `Authorization: Bearer <token>` when a token is
//!   stored under `token`
//! - a 401 response clears `token` and `user` and navigates to `/login`,
//!   unless the current page already is `/login` or `/admin/login`
//! - every other response is returned to the caller untouched
//!
//! Requests time out after 10 seconds and are never retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studyshala::client::{ApiClient, HistoryNavigator, MemoryTokenStore};
//!
//! # async fn run() -> Result<(), studyshala::client::ClientError> {
//! let client = ApiClient::new(
//!     "http://localhost:5000",
//!     Arc::new(MemoryTokenStore::new()),
//!     Arc::new(HistoryNavigator::default()),
//! )?;
//! let login = client.login("asha@studyshala.test", "password123").await?;
//! println!("logged in as {}", login.user.name);
//! # Ok(())
//! # }
//! ```

mod navigation;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::error::ErrorBody;
use crate::server::{HealthResponse, LoginResponse, MessageResponse, UserResponse};

pub use navigation::{is_login_page, HistoryNavigator, Navigator, ADMIN_LOGIN_PATH, LOGIN_PATH};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY, USER_KEY};

/// Server used when the page is served from this machine.
pub const DEFAULT_LOCAL_API_URL: &str = "http://localhost:5000";

/// Deployed server used when nothing else applies.
pub const PRODUCTION_API_URL: &str = "https://studyshala-backend.onrender.com";

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server responded {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status, when the error came from a server response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Pick the server base URL.
///
/// An explicit URL wins. Otherwise a page served from `localhost` or
/// `127.0.0.1` (or no page at all, as for the CLI) talks to the local server,
/// and anything else to the production server.
pub fn resolve_base_url(explicit: Option<&str>, page_host: Option<&str>) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    match page_host {
        None | Some("localhost") | Some("127.0.0.1") => DEFAULT_LOCAL_API_URL.to_string(),
        Some(_) => PRODUCTION_API_URL.to_string(),
    }
}

/// `<base>/api/`, ready for relative joins.
pub fn api_root(base_url: &str) -> Result<Url, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    Url::parse(&format!("{}/api/", trimmed))
        .map_err(|_| ClientError::InvalidBaseUrl(base_url.to_string()))
}

// =============================================================================
// API Client
// =============================================================================

/// API client with bearer-token injection and 401 interception.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_root: Url,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (without `/api`).
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_root: api_root(base_url)?,
            tokens,
            navigator,
        })
    }

    /// Resolved `<base>/api/` URL.
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Start a request to `path` (relative to `/api`), with the bearer token
    /// attached when one is stored.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self
            .api_root
            .join(path.trim_start_matches('/'))
            .map_err(|_| ClientError::InvalidBaseUrl(format!("{}{}", self.api_root, path)))?;

        let builder = self.http.request(method, url);
        Ok(match self.tokens.get(TOKEN_KEY) {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        })
    }

    /// Send a request, applying the 401 policy. The response is returned
    /// whatever its status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized()?;
        }
        Ok(response)
    }

    fn handle_unauthorized(&self) -> Result<(), ClientError> {
        self.tokens.remove(TOKEN_KEY)?;
        self.tokens.remove(USER_KEY)?;

        let current = self.navigator.current_path();
        if is_login_page(&current) {
            debug!(page = %current, "Unauthorized on a login page; staying");
        } else {
            info!(from = %current, "Session rejected; redirecting to login");
            self.navigator.navigate(LOGIN_PATH);
        }
        Ok(())
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Status { status, message });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.json(self.request(Method::GET, "health")?).await
    }

    /// `POST /api/auth/login`. Stores `token` and `user` on success.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, ClientError> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            identifier: &'a str,
            password: &'a str,
        }

        let request = self
            .request(Method::POST, "auth/login")?
            .json(&Credentials {
                identifier,
                password,
            });
        let login: LoginResponse = self.json(request).await?;

        self.tokens.set(TOKEN_KEY, &login.token)?;
        self.tokens
            .set(USER_KEY, &serde_json::to_string(&login.user)?)?;
        Ok(login)
    }

    /// `POST /api/auth/logout`. Stored credentials are cleared even if the
    /// server call fails.
    pub async fn logout(&self) -> Result<MessageResponse, ClientError> {
        let result = match self.request(Method::POST, "auth/logout") {
            Ok(request) => self.json(request).await,
            Err(e) => Err(e),
        };
        self.tokens.remove(TOKEN_KEY)?;
        self.tokens.remove(USER_KEY)?;
        result
    }

    /// `GET /api/auth/me`
    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.json(self.request(Method::GET, "auth/me")?).await
    }
}
