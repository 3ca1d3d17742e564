//! Credential hashing via bcrypt.
//!
//! bcrypt is deliberately slow, so the async wrappers move the work onto the
//! blocking pool instead of stalling the request executor.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use super::AuthError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

/// Hashes compared against when a login names an unknown handle, one per
/// cost factor in use.
static DUMMY_HASHES: LazyLock<DashMap<u32, Arc<str>>> = LazyLock::new(DashMap::new);

/// A fixed hash at `cost`, so an unknown handle costs the same verify work as
/// a wrong credential for an identity hashed at that cost.
pub fn dummy_hash(cost: u32) -> Result<Arc<str>, AuthError> {
    if let Some(hash) = DUMMY_HASHES.get(&cost) {
        return Ok(hash.clone());
    }
    let hash: Arc<str> = hash_password("bytegate-dummy-credential", cost)?.into();
    Ok(DUMMY_HASHES.entry(cost).or_insert(hash).clone())
}

/// Hash a credential with bcrypt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a credential against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("hash task: {e}")))?
}

/// [`verify_password`] on the blocking pool. `None` burns the same work on
/// the dummy hash for `cost` and always reports a mismatch.
pub async fn verify_password_blocking(
    password: String,
    hash: Option<String>,
    cost: u32,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            let _ = bcrypt::verify(&password, &dummy_hash(cost)?);
            Ok(false)
        }
    })
    .await
    .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?
}
