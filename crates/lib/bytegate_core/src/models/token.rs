//! Token claims and the per-request verified context derived from them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Role, RoleSet};

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the identity's handle.
    pub sub: String,
    /// Durable identifier, kept separate from the subject.
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub roles: RoleSet,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Verified identity of the caller for one request.
///
/// Built either from a decoded token or from the trust headers injected by the
/// edge gateway. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedContext {
    pub user_id: Uuid,
    pub subject: String,
    pub roles: RoleSet,
}

impl VerifiedContext {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(Role::Admin)
    }
}

impl From<TokenClaims> for VerifiedContext {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            subject: claims.sub,
            roles: claims.roles,
        }
    }
}
