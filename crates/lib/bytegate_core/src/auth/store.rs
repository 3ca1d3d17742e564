//! Credential store contract.
//!
//! The issuer only needs a handful of narrow operations. Uniqueness of the
//! handle is the store's job: two concurrent inserts of the same handle must
//! end with one success and one [`AuthError::DuplicateIdentity`].

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthError;
use crate::models::Identity;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an identity by its (already normalised) handle.
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>, AuthError>;

    /// Look up an identity by its durable id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    /// Whether an identity with this id is persisted.
    async fn exists(&self, id: Uuid) -> Result<bool, AuthError>;

    /// Persist a new identity. Fails with `DuplicateIdentity` when the handle
    /// is taken, atomically with respect to concurrent inserts.
    async fn insert(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Persist role, credential hash and `updated_at` of an existing identity.
    async fn update(&self, identity: &Identity) -> Result<(), AuthError>;
}
