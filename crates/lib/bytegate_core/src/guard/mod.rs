//! Authorization guard.
//!
//! Evaluates a [`Policy`] against the [`VerifiedContext`] of a request. Every
//! failure path, including a failing ownership lookup, ends in
//! [`GuardError::Forbidden`]. Nothing here trusts state outside the context.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::store::CredentialStore;
use crate::models::{RoleSet, VerifiedContext};

/// Authorization failure. Deliberately carries no detail the client could use
/// to enumerate resources; the reason is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// What an operation requires of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Any verified caller.
    Authenticated,
    /// Caller holds at least one of these roles.
    AnyRole(RoleSet),
    /// Caller owns the target resource, or is `ADMIN`.
    OwnerOrAdmin,
}

/// Resolves the owner of a resource id.
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    /// `Ok(None)` when the resource does not exist.
    async fn owner_of(&self, resource: Uuid) -> Result<Option<Uuid>, AuthError>;
}

/// Ownership over identities: every identity owns itself.
pub struct IdentityOwnership {
    store: Arc<dyn CredentialStore>,
}

impl IdentityOwnership {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OwnershipLookup for IdentityOwnership {
    async fn owner_of(&self, resource: Uuid) -> Result<Option<Uuid>, AuthError> {
        Ok(self.store.exists(resource).await?.then_some(resource))
    }
}

/// Pure role check: passes when `held` and `required` share a role.
pub fn check_roles(held: &RoleSet, required: &RoleSet) -> Result<(), GuardError> {
    if held.intersects(required) {
        Ok(())
    } else {
        Err(GuardError::Forbidden(format!(
            "requires one of [{}], caller has [{}]",
            required.to_header_value(),
            held.to_header_value()
        )))
    }
}

/// Policy evaluator. Ownership checks need a lookup; without one,
/// [`Policy::OwnerOrAdmin`] only admits admins.
#[derive(Clone, Default)]
pub struct Guard {
    ownership: Option<Arc<dyn OwnershipLookup>>,
}

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ownership(ownership: Arc<dyn OwnershipLookup>) -> Self {
        Self {
            ownership: Some(ownership),
        }
    }

    /// Evaluate `policy` for `ctx`. `resource` is the target id for
    /// ownership policies and ignored otherwise.
    pub async fn check(
        &self,
        ctx: &VerifiedContext,
        policy: &Policy,
        resource: Option<Uuid>,
    ) -> Result<(), GuardError> {
        let outcome = match policy {
            Policy::Authenticated => Ok(()),
            Policy::AnyRole(required) => check_roles(&ctx.roles, required),
            Policy::OwnerOrAdmin => self.check_ownership(ctx, resource).await,
        };
        match &outcome {
            Ok(()) => debug!(user_id = %ctx.user_id, ?policy, "access granted"),
            Err(GuardError::Forbidden(reason)) => {
                warn!(user_id = %ctx.user_id, ?policy, %reason, "access denied")
            }
        }
        outcome
    }

    async fn check_ownership(
        &self,
        ctx: &VerifiedContext,
        resource: Option<Uuid>,
    ) -> Result<(), GuardError> {
        if ctx.is_admin() {
            return Ok(());
        }
        let Some(resource) = resource else {
            return Err(GuardError::Forbidden("no target resource".into()));
        };
        let Some(lookup) = &self.ownership else {
            return Err(GuardError::Forbidden("ownership cannot be resolved".into()));
        };
        match lookup.owner_of(resource).await {
            Ok(Some(owner)) if owner == ctx.user_id => Ok(()),
            Ok(Some(_)) => Err(GuardError::Forbidden(format!("{resource} is owned by another identity"))),
            Ok(None) => Err(GuardError::Forbidden(format!("{resource} not found"))),
            Err(e) => Err(GuardError::Forbidden(format!("ownership lookup failed: {e}"))),
        }
    }
}
