//! Identity issuer: turns credentials into tokens.
//!
//! Registration and login both end in a freshly minted token. The issuer is
//! also the only place identities are mutated (role reassignment, credential
//! rotation).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::jwt::TokenCodec;
use super::password::{BCRYPT_COST, hash_password_blocking, verify_password_blocking};
use super::store::CredentialStore;
use super::AuthError;
use crate::models::{Identity, Role};

/// Longest accepted handle.
pub const MAX_HANDLE_LEN: usize = 254;
/// Display name bounds, in characters.
pub const DISPLAY_NAME_LEN: std::ops::RangeInclusive<usize> = 3..=60;
/// Raw credential bounds, in bytes. bcrypt ignores anything past 72.
pub const CREDENTIAL_LEN: std::ops::RangeInclusive<usize> = 8..=72;

/// A minted token plus the identity facts returned alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Uuid,
    pub handle: String,
    pub role: Role,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

/// Authenticates credentials against a [`CredentialStore`] and mints tokens
/// with a shared [`TokenCodec`].
pub struct IdentityIssuer {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    hash_cost: u32,
}

impl IdentityIssuer {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        Self {
            store,
            codec,
            hash_cost: BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Register a new `CUSTOMER` identity and log it in.
    pub async fn register(
        &self,
        handle: &str,
        display_name: &str,
        raw_credential: &str,
    ) -> Result<IssuedToken, AuthError> {
        let handle = normalize_handle(handle);
        let display_name = display_name.trim();
        validate_handle(&handle)?;
        validate_display_name(display_name)?;
        validate_credential(raw_credential)?;

        if self.store.find_by_handle(&handle).await?.is_some() {
            return Err(AuthError::DuplicateIdentity(handle));
        }

        let hash = hash_password_blocking(raw_credential.to_string(), self.hash_cost).await?;
        let identity = Identity::new(handle, display_name, hash)?;

        // The store's uniqueness guarantee settles any race the pre-check missed.
        self.store.insert(&identity).await?;
        info!(user_id = %identity.id, handle = %identity.handle, "identity registered");

        self.mint(&identity)
    }

    /// Authenticate `handle` + `raw_credential`. Unknown handles and wrong
    /// credentials both fail with `BadCredentials`.
    pub async fn login(&self, handle: &str, raw_credential: &str) -> Result<IssuedToken, AuthError> {
        let handle = normalize_handle(handle);
        let identity = self.store.find_by_handle(&handle).await?;
        let hash = identity
            .as_ref()
            .and_then(|i| i.credential_hash())
            .map(str::to_string);

        let matched = verify_password_blocking(raw_credential.to_string(), hash, self.hash_cost).await?;
        match identity {
            Some(identity) if matched => {
                info!(user_id = %identity.id, "login succeeded");
                self.mint(&identity)
            }
            _ => {
                warn!(handle = %handle, "login rejected");
                Err(AuthError::BadCredentials)
            }
        }
    }

    /// Persisted identity for `user_id`.
    pub async fn identity(&self, user_id: Uuid) -> Result<Identity, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("identity {user_id}")))
    }

    /// Whether `user_id` names a persisted identity.
    pub async fn exists(&self, user_id: Uuid) -> Result<bool, AuthError> {
        self.store.exists(user_id).await
    }

    /// Give `user_id` a new role. Takes effect on the next login; tokens
    /// already minted keep their role until they expire.
    pub async fn reassign_role(&self, user_id: Uuid, role: Role) -> Result<Identity, AuthError> {
        let mut identity = self.identity(user_id).await?;
        let previous = identity.role;
        identity.assign_role(role);
        self.store.update(&identity).await?;
        info!(user_id = %user_id, from = %previous, to = %role, "role reassigned");
        Ok(identity)
    }

    /// Replace the stored credential of `user_id`.
    pub async fn rotate_credential(&self, user_id: Uuid, raw_credential: &str) -> Result<(), AuthError> {
        validate_credential(raw_credential)?;
        let mut identity = self.identity(user_id).await?;
        if identity.is_externally_authenticated() {
            return Err(AuthError::InvalidInput(
                "externally authenticated identities have no credential".into(),
            ));
        }
        let hash = hash_password_blocking(raw_credential.to_string(), self.hash_cost).await?;
        identity.set_credential_hash(Some(hash))?;
        self.store.update(&identity).await?;
        info!(user_id = %user_id, "credential rotated");
        Ok(())
    }

    fn mint(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        let token = self.codec.issue(identity, Utc::now())?;
        Ok(IssuedToken {
            token,
            user_id: identity.id,
            handle: identity.handle.clone(),
            role: identity.role,
            expires_in: self.codec.ttl().num_seconds(),
        })
    }
}

/// Handles compare case-insensitively and ignore surrounding whitespace.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}

fn validate_handle(handle: &str) -> Result<(), AuthError> {
    if handle.is_empty() {
        return Err(AuthError::InvalidInput("handle is required".into()));
    }
    if handle.chars().count() > MAX_HANDLE_LEN {
        return Err(AuthError::InvalidInput(format!(
            "handle must be at most {MAX_HANDLE_LEN} characters"
        )));
    }
    let well_formed = match handle.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !handle.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(AuthError::InvalidInput("handle must be an email address".into()));
    }
    Ok(())
}

fn validate_display_name(name: &str) -> Result<(), AuthError> {
    let len = name.chars().count();
    if !DISPLAY_NAME_LEN.contains(&len) {
        return Err(AuthError::InvalidInput(format!(
            "display name must be between {} and {} characters",
            DISPLAY_NAME_LEN.start(),
            DISPLAY_NAME_LEN.end()
        )));
    }
    Ok(())
}

fn validate_credential(raw: &str) -> Result<(), AuthError> {
    if !CREDENTIAL_LEN.contains(&raw.len()) {
        return Err(AuthError::InvalidInput(format!(
            "credential must be between {} and {} bytes",
            CREDENTIAL_LEN.start(),
            CREDENTIAL_LEN.end()
        )));
    }
    Ok(())
}
