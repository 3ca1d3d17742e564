//! Route-level policy enforcement.
//!
//! Must sit inside [`require_identity`](super::identity::require_identity):
//! it reads the [`AuthenticatedUser`] that middleware inserts.

use axum::{
    RequestExt,
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use bytegate_core::guard::{Guard, Policy};
use tracing::warn;
use uuid::Uuid;

use super::identity::AuthenticatedUser;
use crate::error::{AppError, UNAUTHENTICATED};

/// Path parameter naming the resource an [`Policy::OwnerOrAdmin`] route
/// protects, as in `/api/v1/restaurants/{id}`.
pub const RESOURCE_PARAM: &str = "id";

/// Guard plus the policy one group of routes requires.
#[derive(Clone)]
pub struct PolicyState {
    pub guard: Guard,
    pub policy: Policy,
}

impl PolicyState {
    pub fn new(guard: Guard, policy: Policy) -> Self {
        Self { guard, policy }
    }
}

/// Axum middleware: 403 unless the caller satisfies the route's policy.
pub async fn enforce_policy(
    State(state): State<PolicyState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(UNAUTHENTICATED.into()))?;
    let resource = match state.policy {
        Policy::OwnerOrAdmin => resource_id(&mut request).await?,
        _ => None,
    };
    state.guard.check(&user.0, &state.policy, resource).await?;
    Ok(next.run(request).await)
}

/// The `{id}` path parameter. `None` when the route has none, which the
/// guard then denies.
async fn resource_id(request: &mut Request) -> Result<Option<Uuid>, AppError> {
    let params = request
        .extract_parts::<RawPathParams>()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?;
    let Some((_, raw)) = params.iter().find(|(name, _)| *name == RESOURCE_PARAM) else {
        warn!(path = %request.uri().path(), "owner-or-admin route has no {{id}} parameter");
        return Ok(None);
    };
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid resource id: {raw}")))
}
