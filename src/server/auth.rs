//! Credentials and session restoration.
//!
//! # Request Flow
//!
//! ```text
//! request ──► session_middleware ──► role_guard (role-scoped groups) ──► handler
//!               │                                                    │
//!               │ bearer header, else studyshala.sid cookie          │ Session::establish / end
//!               │ verify signature → load record → load principal     │
//!               ▼                                                    ▼
//!          Session (request extension) ◄────────────── Set-Cookie written on the way out
//! ```
//!
//! Any failure while restoring a session (bad signature, expired record,
//! deleted principal, store error) leaves the request unauthenticated. It never
//! fails the request by itself; routes that need a principal reject it with
//! 401 through [`CurrentPrincipal`] or [`role_guard`].

use std::sync::{Arc, OnceLock};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, warn};

use super::boundary::Outcome;
use super::handlers::AppState;
use crate::error::AppError;
use crate::session::{read_cookie, SessionRecord};
use crate::store::{Principal, Role, UserStore};

// =============================================================================
// Password Hashing
// =============================================================================

/// Bytes of salt per password hash.
const SALT_BYTES: usize = 16;

/// Hash compared against when the identifier is unknown, so a miss costs the
/// same as a wrong password.
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Hash a password into an Argon2id PHC string. CPU-bound.
pub fn hash_password_blocking(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("salt encoding failed: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a password against a PHC string. Unparseable hashes never match.
pub fn verify_password_blocking(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
}

/// Verify a password on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))
}

fn dummy_hash() -> String {
    DUMMY_HASH
        .get_or_init(|| hash_password_blocking("studyshala-timing-equalizer").unwrap_or_default())
        .clone()
}

/// Local strategy: resolve a principal from identifier and password.
///
/// Unknown identifiers and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn UserStore,
    identifier: &str,
    password: &str,
) -> Result<Principal, AppError> {
    let principal = users.find_by_identifier(identifier).await?;

    let hash = match principal {
        Some(ref p) => p.password_hash.clone(),
        None => tokio::task::spawn_blocking(dummy_hash)
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?,
    };
    let verified = verify_password(password.to_string(), hash).await?;

    match principal {
        Some(p) if verified => Ok(p),
        _ => {
            debug!(identifier = %identifier, "Login rejected");
            Err(AppError::InvalidCredentials)
        }
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// What the handler did to the session, applied to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionChange {
    Unchanged,
    Issued(String),
    Ended,
}

#[derive(Debug)]
struct SessionSlot {
    record: Option<SessionRecord>,
    principal: Option<Principal>,
    change: SessionChange,
}

/// Per-request view of the session, shared between the middleware and the
/// handler through request extensions.
#[derive(Clone)]
pub struct Session {
    state: AppState,
    slot: Arc<Mutex<SessionSlot>>,
}

impl Session {
    fn new(state: AppState, record: Option<SessionRecord>, principal: Option<Principal>) -> Self {
        Self {
            state,
            slot: Arc::new(Mutex::new(SessionSlot {
                record,
                principal,
                change: SessionChange::Unchanged,
            })),
        }
    }

    /// The authenticated principal, if any.
    pub fn principal(&self) -> Option<Principal> {
        self.slot.lock().principal.clone()
    }

    /// Start a session for `principal`, replacing any current one.
    ///
    /// Returns the signed session value, which is also sent as the cookie.
    pub async fn establish(&self, principal: &Principal) -> Result<String, AppError> {
        let previous = self.slot.lock().record.as_ref().map(|r| r.id.clone());
        if let Some(id) = previous {
            self.state.sessions.destroy(&id).await?;
        }

        let record = self
            .state
            .sessions
            .create(&principal.id, principal.role, self.state.clock.now())
            .await?;
        let value = self.state.signer.sign(&record.id);
        info!(principal_id = %principal.id, role = %principal.role, "Session started");

        let mut slot = self.slot.lock();
        slot.record = Some(record);
        slot.principal = Some(principal.clone());
        slot.change = SessionChange::Issued(value.clone());
        Ok(value)
    }

    /// End the current session. The cookie is cleared either way.
    ///
    /// Returns whether a session existed.
    pub async fn end(&self) -> Result<bool, AppError> {
        let current = self.slot.lock().record.take();
        let existed = match current {
            Some(record) => {
                self.state.sessions.destroy(&record.id).await?;
                info!(principal_id = %record.principal_id, "Session ended");
                true
            }
            None => false,
        };

        let mut slot = self.slot.lock();
        slot.principal = None;
        slot.change = SessionChange::Ended;
        Ok(existed)
    }

    fn take_change(&self) -> SessionChange {
        std::mem::replace(&mut self.slot.lock().change, SessionChange::Unchanged)
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session middleware is not installed".to_string()))
    }
}

/// Extractor for the authenticated principal. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session
            .principal()
            .map(CurrentPrincipal)
            .ok_or(AppError::Unauthenticated)
    }
}

/// JSON body extractor whose rejections go through [`AppError`].
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

// =============================================================================
// Middleware
// =============================================================================

/// The signed session value presented by the request.
///
/// `Authorization: Bearer` takes precedence over the cookie.
pub fn presented_session_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    bearer.or_else(|| read_cookie(headers, cookie_name).filter(|v| !v.is_empty()))
}

/// Resolve a presented value into a session and its principal.
async fn restore_session(
    state: &AppState,
    value: &str,
) -> (Option<SessionRecord>, Option<Principal>) {
    let session_id = match state.signer.verify(value) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "Ignoring session value");
            return (None, None);
        }
    };

    let record = match state.sessions.load(&session_id, state.clock.now()).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!("Session unknown or expired");
            return (None, None);
        }
        Err(e) => {
            warn!(error = %e, "Session store lookup failed");
            return (None, None);
        }
    };

    match state.users.find_by_id(&record.principal_id).await {
        Ok(Some(principal)) => (Some(record), Some(principal)),
        Ok(None) => {
            debug!(principal_id = %record.principal_id, "Session principal no longer exists");
            if let Err(e) = state.sessions.destroy(&record.id).await {
                warn!(error = %e, "Failed to destroy orphaned session");
            }
            (None, None)
        }
        Err(e) => {
            warn!(error = %e, principal_id = %record.principal_id, "User store lookup failed");
            (None, None)
        }
    }
}

/// Restore the session before the handler runs and persist changes after it.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let (record, principal) =
        match presented_session_value(request.headers(), &state.cookie.name) {
            Some(value) => restore_session(&state, &value).await,
            None => (None, None),
        };

    let session = Session::new(state.clone(), record, principal);
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let set_cookie = match session.take_change() {
        SessionChange::Unchanged => None,
        SessionChange::Issued(value) => Some(state.cookie.set_cookie(&value)),
        SessionChange::Ended => Some(state.cookie.clear_cookie()),
    };
    if let Some(cookie) = set_cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Session cookie is not a valid header value"),
        }
    }

    response
}

/// Admit only principals holding the route group's role.
pub async fn role_guard(State(required): State<Role>, request: Request, next: Next) -> Outcome {
    let principal = match request.extensions().get::<Session>().and_then(Session::principal) {
        Some(principal) => principal,
        None => return Outcome::Error(AppError::Unauthenticated),
    };

    if principal.role != required {
        warn!(
            principal_id = %principal.id,
            role = %principal.role,
            required = %required,
            "Role not permitted"
        );
        return Outcome::Error(AppError::Forbidden);
    }

    Outcome::Handled(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
