//! # bytegate_api
//!
//! HTTP surface for Bytegate: the identity service router, the edge gateway
//! router, and the middleware backend services use to authorize callers.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use bytegate_core::auth::issuer::IdentityIssuer;
use bytegate_core::guard::{Guard, Policy};
use bytegate_core::models::{Role, RoleSet};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{auth, health, users};
use crate::middleware::edge::{EdgeVerifier, verify_edge};
use crate::middleware::guard::{PolicyState, enforce_policy};
use crate::middleware::identity::{TrustMode, require_identity};
use crate::services::proxy::{Forwarder, forward_handler};

/// Shared state of the identity service.
#[derive(Clone)]
pub struct IdentityState {
    pub issuer: Arc<IdentityIssuer>,
    /// Guard with identity ownership wired in.
    pub guard: Guard,
    /// How `/api/v1/users/**` learns the caller.
    pub trust: TrustMode,
}

/// Shared state of the edge gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub verifier: EdgeVerifier,
    pub forwarder: Forwarder,
}

/// Run embedded database migrations.
///
/// Delegates to `bytegate_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    bytegate_core::migrate::migrate(pool).await
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Put `router` behind backend identity resolution and `policy`.
pub fn guarded<S>(router: Router<S>, trust: TrustMode, guard: Guard, policy: Policy) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(axum::middleware::from_fn_with_state(
            PolicyState::new(guard, policy),
            enforce_policy,
        ))
        .layer(axum::middleware::from_fn_with_state(trust, require_identity))
}

/// Builds the identity service router.
pub fn identity_router(state: IdentityState) -> Router {
    // Registration and login happen before any token exists.
    let public = Router::new()
        .route("/api/v1/auth/register", post(auth::register_handler))
        .route("/api/v1/auth/login", post(auth::login_handler))
        .route("/actuator/health", get(health::health));

    // `/api/v1/auth/**` is allow-listed at the edge, so these verify the token
    // themselves whatever the configured trust mode.
    let self_verified = guarded(
        Router::new()
            .route("/api/v1/auth/logout", post(auth::logout_handler))
            .route("/api/v1/auth/check-roles", get(auth::check_roles_handler)),
        TrustMode::VerifyToken(state.issuer.codec().clone()),
        state.guard.clone(),
        Policy::Authenticated,
    );

    let users = guarded(
        Router::new()
            .route("/api/v1/users/me", get(users::me_handler))
            .route("/api/v1/users/{id}", get(users::get_user_handler))
            .route("/api/v1/users/{id}/exists", get(users::exists_handler)),
        state.trust.clone(),
        state.guard.clone(),
        Policy::Authenticated,
    );

    let admin = guarded(
        Router::new().route("/api/v1/users/{id}/role", patch(users::change_role_handler)),
        state.trust.clone(),
        state.guard.clone(),
        Policy::AnyRole(RoleSet::single(Role::Admin)),
    );

    Router::new()
        .merge(public)
        .merge(self_verified)
        .merge(users)
        .merge(admin)
        .layer(cors())
        .with_state(state)
}

/// Builds the edge gateway router. Verification is the outermost layer, so
/// it runs before any other middleware sees the request.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/actuator/health", get(health::health))
        .fallback(forward_handler)
        .with_state(state.forwarder)
        .layer(cors())
        .layer(axum::middleware::from_fn_with_state(state.verifier, verify_edge))
}
