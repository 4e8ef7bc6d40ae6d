//! Principals and the user store they live in.
//!
//! The store is an injected service handle: handlers only see
//! `Arc<dyn UserStore>`, so a database-backed implementation can replace
//! [`MemoryUserStore`] without touching request code.

mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::MemoryUserStore;

/// Role a principal holds. Each route group is scoped to exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "admin" => Ok(Role::Admin),
            other => Err(format!(
                "unknown role '{}': expected student, faculty or admin",
                other
            )),
        }
    }
}

/// A user record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Opaque store identifier
    pub id: String,

    /// Unique login identifier (stored normalized)
    pub identifier: String,

    /// Display name
    pub name: String,

    pub role: Role,

    /// Argon2 PHC string
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

/// Principal as exposed over the API. Never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalView {
    pub id: String,
    pub identifier: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            identifier: principal.identifier.clone(),
            name: principal.name.clone(),
            role: principal.role,
            created_at: principal.created_at,
        }
    }
}

/// Fields needed to register a principal. Also the shape of seed file entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPrincipal {
    pub identifier: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Normalize a login identifier for storage and lookup.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Persistence for principals.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a principal by store id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError>;

    /// Look up a principal by login identifier (case-insensitive).
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, StoreError>;

    /// List principals ordered by identifier, optionally restricted to one role.
    async fn list(&self, role: Option<Role>) -> Result<Vec<Principal>, StoreError>;

    /// Register a principal. Fails with [`StoreError::Duplicate`] if the
    /// identifier is taken.
    async fn insert(&self, new: NewPrincipal) -> Result<Principal, StoreError>;

    /// Remove a principal. Returns whether it existed.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;

    /// Number of stored principals.
    async fn count(&self) -> Result<usize, StoreError>;
}
