//! In-memory credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::CredentialStore;
use crate::auth::AuthError;
use crate::models::auth::{CredentialRecord, NewCredential};

/// Credential store held in process memory. Contents vanish on drop.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<Uuid, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn conflicts(existing: &CredentialRecord, id: Uuid, email: &str, username: &str) -> bool {
    existing.id != id && (existing.email == email || existing.username == username)
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        let records = self.records.read().await;
        let found = records
            .values()
            .find(|r| r.email == email)
            .or_else(|| records.values().find(|r| r.username == username));
        Ok(found.cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>, AuthError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, AuthError> {
        let id = Uuid::now_v7();
        // Uniqueness check and insert happen under one write lock.
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| conflicts(r, id, &credential.email, &credential.username))
        {
            return Err(AuthError::DuplicateIdentity);
        }

        let record = CredentialRecord {
            id,
            username: credential.username,
            email: credential.email,
            password_hash: credential.password_hash,
            role: credential.role,
            created_at: Utc::now(),
        };
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn save(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        let mut records = self.records.write().await;
        if !records.contains_key(&record.id) {
            return Err(AuthError::Internal(format!(
                "credential {} does not exist",
                record.id
            )));
        }
        if records
            .values()
            .any(|r| conflicts(r, record.id, &record.email, &record.username))
        {
            return Err(AuthError::DuplicateIdentity);
        }
        records.insert(record.id, record.clone());
        Ok(())
    }
}
