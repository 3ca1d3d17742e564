//! Identity lookups and administration.

use axum::extract::State;
use axum::{Extension, Json};
use bytegate_core::guard::Policy;
use uuid::Uuid;

use crate::IdentityState;
use crate::error::AppResult;
use crate::extract::{AppJson, AppPath};
use crate::middleware::identity::AuthenticatedUser;
use crate::models::{ApiResponse, ExistsResponse, IdentityResponse, RoleChangeRequest};

/// `GET /api/v1/users/me`: the caller's persisted identity.
pub async fn me_handler(
    State(state): State<IdentityState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<IdentityResponse>>> {
    let identity = state.issuer.identity(user.0.user_id).await?;
    Ok(Json(ApiResponse::ok("User retrieved", IdentityResponse::from(&identity))))
}

/// `GET /api/v1/users/{id}`: owner or admin only.
pub async fn get_user_handler(
    State(state): State<IdentityState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<IdentityResponse>>> {
    state.guard.check(&user.0, &Policy::OwnerOrAdmin, Some(id)).await?;
    let identity = state.issuer.identity(id).await?;
    Ok(Json(ApiResponse::ok("User retrieved", IdentityResponse::from(&identity))))
}

/// `GET /api/v1/users/{id}/exists`
pub async fn exists_handler(
    State(state): State<IdentityState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ExistsResponse>> {
    let exists = state.issuer.exists(id).await?;
    Ok(Json(ExistsResponse { exists }))
}

/// `PATCH /api/v1/users/{id}/role`: admin only (enforced by route layer).
pub async fn change_role_handler(
    State(state): State<IdentityState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<RoleChangeRequest>,
) -> AppResult<Json<ApiResponse<IdentityResponse>>> {
    let identity = state.issuer.reassign_role(id, body.role).await?;
    Ok(Json(ApiResponse::ok("Role updated", IdentityResponse::from(&identity))))
}
