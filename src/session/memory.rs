use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore};
use crate::error::StoreError;
use crate::store::Role;
use crate::token::generate_secure_token;

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        principal_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StoreError> {
        let record = SessionRecord::new(
            generate_secure_token(),
            principal_id.to_string(),
            role,
            now,
        );
        self.sessions
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>, StoreError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return Ok(None),
                Some(record) if record.is_valid_at(now) => return Ok(Some(record.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it so it cannot be revived.
        self.sessions.write().await.remove(id);
        Ok(None)
    }

    async fn destroy(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| record.is_valid_at(now));
        Ok(before - sessions.len())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.sessions.read().await.len())
    }
}
