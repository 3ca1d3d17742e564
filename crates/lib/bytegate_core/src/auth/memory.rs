//! In-memory credential store.
//!
//! Used for local development (`--in-memory`) and tests. Handle uniqueness is
//! enforced through the `DashMap` entry API, which holds the shard lock across
//! the check and the insert.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::Identity;

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    by_handle: DashMap<String, Identity>,
    handles: DashMap<Uuid, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities.
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self.by_handle.get(handle).map(|e| e.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let Some(handle) = self.handles.get(&id).map(|h| h.value().clone()) else {
            return Ok(None);
        };
        self.find_by_handle(&handle).await
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.handles.contains_key(&id))
    }

    async fn insert(&self, identity: &Identity) -> Result<(), AuthError> {
        match self.by_handle.entry(identity.handle.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateIdentity(identity.handle.clone())),
            Entry::Vacant(slot) => {
                self.handles.insert(identity.id, identity.handle.clone());
                slot.insert(identity.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, identity: &Identity) -> Result<(), AuthError> {
        let handle = self
            .handles
            .get(&identity.id)
            .map(|h| h.value().clone())
            .ok_or_else(|| AuthError::NotFound(format!("identity {}", identity.id)))?;
        let mut stored = self
            .by_handle
            .get_mut(&handle)
            .ok_or_else(|| AuthError::NotFound(format!("identity {}", identity.id)))?;
        stored.set_credential_hash(identity.credential_hash().map(str::to_string))?;
        stored.role = identity.role;
        stored.updated_at = identity.updated_at;
        Ok(())
    }
}
