use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{normalize_identifier, NewPrincipal, Principal, Role, UserStore};
use crate::error::StoreError;
use crate::token::generate_secure_token_with_size;

/// Bytes of entropy in a generated principal id.
const PRINCIPAL_ID_BYTES: usize = 12;

/// In-process user store keyed by principal id.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, Principal>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed entries, rejecting duplicate identifiers.
    pub fn from_seed(seed: Vec<NewPrincipal>) -> Result<Self, StoreError> {
        let mut users: HashMap<String, Principal> = HashMap::with_capacity(seed.len());
        for new in seed {
            let principal = build_principal(new)?;
            if users.values().any(|u| u.identifier == principal.identifier) {
                return Err(StoreError::Duplicate(principal.identifier));
            }
            users.insert(principal.id.clone(), principal);
        }
        Ok(Self {
            users: RwLock::new(users),
        })
    }

    /// Load seed entries from a JSON array on disk.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let seed: Vec<NewPrincipal> = serde_json::from_str(&content)?;
        debug!(
            path = %path.as_ref().display(),
            entries = seed.len(),
            "Loaded user seed file"
        );
        Self::from_seed(seed)
    }
}

fn build_principal(new: NewPrincipal) -> Result<Principal, StoreError> {
    let identifier = normalize_identifier(&new.identifier);
    if identifier.is_empty() {
        return Err(StoreError::Seed("identifier must not be empty".to_string()));
    }
    if new.password_hash.trim().is_empty() {
        return Err(StoreError::Seed(format!(
            "principal '{}' has no password hash",
            identifier
        )));
    }
    Ok(Principal {
        id: generate_secure_token_with_size(PRINCIPAL_ID_BYTES),
        identifier,
        name: new.name.trim().to_string(),
        role: new.role,
        password_hash: new.password_hash,
        created_at: Utc::now(),
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, StoreError> {
        let wanted = normalize_identifier(identifier);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.identifier == wanted).cloned())
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<Principal>, StoreError> {
        let users = self.users.read().await;
        let mut listed: Vec<Principal> = users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(listed)
    }

    async fn insert(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let principal = build_principal(new)?;
        let mut users = self.users.write().await;
        if users.values().any(|u| u.identifier == principal.identifier) {
            return Err(StoreError::Duplicate(principal.identifier));
        }
        users.insert(principal.id.clone(), principal.clone());
        Ok(principal)
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.users.read().await.len())
    }
}
