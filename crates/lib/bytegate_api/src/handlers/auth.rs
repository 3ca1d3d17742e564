//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::info;

use crate::IdentityState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::identity::AuthenticatedUser;
use crate::models::{ApiResponse, AuthResponse, CheckRolesResponse, LoginRequest, RegisterRequest};

/// `POST /api/v1/auth/register`: create a `CUSTOMER` identity and log it in.
pub async fn register_handler(
    State(state): State<IdentityState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let issued = state
        .issuer
        .register(&body.email, &body.name, &body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User registered successfully", issued.into())),
    ))
}

/// `POST /api/v1/auth/login`: exchange credentials for a token.
pub async fn login_handler(
    State(state): State<IdentityState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let issued = state.issuer.login(&body.email, &body.password).await?;
    Ok(Json(ApiResponse::ok("Login successful", issued.into())))
}

/// `POST /api/v1/auth/logout`: acknowledge. Tokens stay valid until expiry.
pub async fn logout_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<ApiResponse<()>> {
    info!(user_id = %user.0.user_id, "logout");
    Json(ApiResponse::message("Logged out successfully"))
}

/// `GET /api/v1/auth/check-roles`: echo the verified context.
pub async fn check_roles_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<CheckRolesResponse>> {
    Json(ApiResponse::ok("Roles retrieved", CheckRolesResponse::from(&user.0)))
}
