//! Server-side sessions.
//!
//! # Lifecycle
//!
//! ```text
//! login ──► create ──► SessionRecord { expires_at = created_at + 24h }
//!                           │
//!          each request ────┤ load(id, now): valid while now < expires_at
//!                           │
//! logout / expiry ─────────► destroy / purge_expired
//! ```
//!
//! Records are only created on a successful login; anonymous requests never
//! produce a row. The lifetime is absolute: loading a session does not extend
//! it.

pub mod cookie;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::Role;

pub use cookie::{read_cookie, CookieError, CookiePolicy, CookieSigner, SameSite};
pub use memory::MemorySessionStore;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "studyshala.sid";

/// Absolute session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Default interval between sweeps of expired sessions.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Source of the current time. Injected so expiry can be tested without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A server-side session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Opaque session identifier (the unsigned cookie payload)
    pub id: String,

    /// Store id of the authenticated principal
    pub principal_id: String,

    /// Role at login time
    pub role: Role,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record that expires [`SESSION_TTL_SECS`] after `now`.
    pub fn new(id: String, principal_id: String, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            principal_id,
            role,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(SESSION_TTL_SECS),
        }
    }

    /// Whether the session may be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Persistence for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session for a principal.
    async fn create(
        &self,
        principal_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StoreError>;

    /// Load a session that is still valid at `now`. Expired records are
    /// removed and reported as absent.
    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>, StoreError>;

    /// Destroy a session. Returns whether it existed.
    async fn destroy(&self, id: &str) -> Result<bool, StoreError>;

    /// Remove every session expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of stored sessions, expired or not.
    async fn len(&self) -> Result<usize, StoreError>;
}

/// Spawn a task that purges expired sessions every `every`.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_sweeper(
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            match sessions.purge_expired(clock.now()).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Purged expired sessions"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}
