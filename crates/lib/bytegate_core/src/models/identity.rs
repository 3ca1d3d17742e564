//! Identity held by the credential store.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Role;
use crate::auth::AuthError;

/// A registered identity.
///
/// The credential hash is private so the "password users always have a hash"
/// invariant can only be changed through [`Identity::set_credential_hash`].
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    /// Unique, email-like handle. Carried as the token subject.
    pub handle: String,
    pub display_name: String,
    credential_hash: Option<String>,
    externally_authenticated: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// New password identity. New identities always start as `CUSTOMER`.
    pub fn new(
        handle: impl Into<String>,
        display_name: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let credential_hash = credential_hash.into();
        if credential_hash.trim().is_empty() {
            return Err(AuthError::ConstraintViolation(
                "credential hash is required for non-external identities".into(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            handle: handle.into(),
            display_name: display_name.into(),
            credential_hash: Some(credential_hash),
            externally_authenticated: false,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        })
    }

    /// New identity authenticated by an external provider; it has no stored
    /// credential and can never log in with one.
    pub fn external(handle: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            handle: handle.into(),
            display_name: display_name.into(),
            credential_hash: None,
            externally_authenticated: true,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an identity from stored columns, re-checking the credential
    /// invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        handle: String,
        display_name: String,
        credential_hash: Option<String>,
        externally_authenticated: bool,
        role: Role,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let mut identity = Self {
            id,
            handle,
            display_name,
            credential_hash: None,
            externally_authenticated,
            role,
            created_at,
            updated_at,
        };
        identity.check_credential(credential_hash.as_deref())?;
        identity.credential_hash = credential_hash;
        Ok(identity)
    }

    pub fn credential_hash(&self) -> Option<&str> {
        self.credential_hash.as_deref()
    }

    pub fn is_externally_authenticated(&self) -> bool {
        self.externally_authenticated
    }

    /// Replace the stored credential hash. Clearing it on a password identity
    /// is a constraint violation and leaves the identity untouched.
    pub fn set_credential_hash(&mut self, hash: Option<String>) -> Result<(), AuthError> {
        self.check_credential(hash.as_deref())?;
        self.credential_hash = hash;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn assign_role(&mut self, role: Role) {
        self.role = role;
        self.updated_at = Utc::now();
    }

    fn check_credential(&self, hash: Option<&str>) -> Result<(), AuthError> {
        let present = hash.is_some_and(|h| !h.trim().is_empty());
        if self.externally_authenticated || present {
            Ok(())
        } else {
            Err(AuthError::ConstraintViolation(format!(
                "identity {} requires a credential hash",
                self.id
            )))
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("display_name", &self.display_name)
            .field("credential_hash", &self.credential_hash.as_ref().map(|_| "<redacted>"))
            .field("externally_authenticated", &self.externally_authenticated)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_identity_defaults_to_customer() {
        let identity = Identity::new("a@example.com", "Alice", "$2b$hash").unwrap();
        assert_eq!(identity.role, Role::Customer);
        assert!(!identity.is_externally_authenticated());
        assert_eq!(identity.credential_hash(), Some("$2b$hash"));
    }

    #[test]
    fn new_identity_requires_hash() {
        let err = Identity::new("a@example.com", "Alice", "  ").unwrap_err();
        assert!(matches!(err, AuthError::ConstraintViolation(_)));
    }

    #[test]
    fn clearing_hash_is_a_constraint_violation() {
        let mut identity = Identity::new("a@example.com", "Alice", "$2b$hash").unwrap();
        let err = identity.set_credential_hash(None).unwrap_err();
        assert!(matches!(err, AuthError::ConstraintViolation(_)));
        assert_eq!(identity.credential_hash(), Some("$2b$hash"));

        let err = identity.set_credential_hash(Some(String::new())).unwrap_err();
        assert!(matches!(err, AuthError::ConstraintViolation(_)));
    }

    #[test]
    fn external_identity_may_have_no_hash() {
        let mut identity = Identity::external("b@example.com", "Bob");
        assert!(identity.credential_hash().is_none());
        identity.set_credential_hash(None).unwrap();
    }

    #[test]
    fn from_parts_rechecks_invariant() {
        let now = Utc::now();
        let err = Identity::from_parts(
            Uuid::now_v7(),
            "a@example.com".into(),
            "Alice".into(),
            None,
            false,
            Role::Customer,
            now,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::ConstraintViolation(_)));
    }

    #[test]
    fn debug_redacts_hash() {
        let identity = Identity::new("a@example.com", "Alice", "$2b$secret").unwrap();
        let printed = format!("{identity:?}");
        assert!(!printed.contains("$2b$secret"));
        assert!(printed.contains("<redacted>"));
    }
}
