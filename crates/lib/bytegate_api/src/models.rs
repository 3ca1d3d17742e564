//! Request and response bodies.

use bytegate_core::auth::issuer::IssuedToken;
use bytegate_core::models::{Identity, Role, RoleSet, VerifiedContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

impl From<IssuedToken> for AuthResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer",
            id: issued.user_id,
            email: issued.handle,
            role: issued.role,
            expires_in: issued.expires_in,
        }
    }
}

/// Public view of a persisted identity. Never includes the credential hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub externally_authenticated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.handle.clone(),
            name: identity.display_name.clone(),
            role: identity.role,
            externally_authenticated: identity.is_externally_authenticated(),
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

/// The caller's verified context, echoed back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRolesResponse {
    pub user_id: Uuid,
    pub subject: String,
    pub roles: RoleSet,
    pub is_admin: bool,
}

impl From<&VerifiedContext> for CheckRolesResponse {
    fn from(ctx: &VerifiedContext) -> Self {
        Self {
            user_id: ctx.user_id,
            subject: ctx.subject.clone(),
            roles: ctx.roles.clone(),
            is_admin: ctx.is_admin(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
