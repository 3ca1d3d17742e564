//! Whole topology: client → gateway → identity service / restaurant backend.
//!
//! The identity service and a sample restaurant backend run on real ports in
//! gateway trust mode; the gateway router is driven with `oneshot`.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bytegate_api::error::AppResult;
use bytegate_api::middleware::edge::EdgeVerifier;
use bytegate_api::middleware::identity::{AuthenticatedUser, TrustMode};
use bytegate_api::services::proxy::{Forwarder, RouteTable};
use bytegate_api::{GatewayState, IdentityState, gateway_router, guarded, identity_router};
use bytegate_core::allow_list::AllowList;
use bytegate_core::auth::AuthError;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::guard::{Guard, OwnershipLookup, Policy};
use bytegate_core::models::{Role, RoleSet};
use common::*;
use serde_json::{Value, json};
use uuid::Uuid;

/// Restaurant id → owning user id.
#[derive(Clone, Default)]
struct Owners(Arc<Mutex<HashMap<Uuid, Uuid>>>);

#[async_trait]
impl OwnershipLookup for Owners {
    async fn owner_of(&self, resource: Uuid) -> Result<Option<Uuid>, AuthError> {
        let owners = self
            .0
            .lock()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(owners.get(&resource).copied())
    }
}

#[derive(Clone)]
struct RestaurantState {
    owners: Owners,
    guard: Guard,
}

async fn create_restaurant(
    State(state): State<RestaurantState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> (StatusCode, Json<Value>) {
    let id = Uuid::now_v7();
    if let Ok(mut owners) = state.owners.0.lock() {
        owners.insert(id, user.0.user_id);
    }
    (StatusCode::CREATED, Json(json!({ "id": id, "owner": user.0.user_id })))
}

async fn get_restaurant(
    State(state): State<RestaurantState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.guard.check(&user.0, &Policy::OwnerOrAdmin, Some(id)).await?;
    Ok(Json(json!({ "id": id })))
}

fn restaurant_router(trust: TrustMode) -> Router {
    let owners = Owners::default();
    let state = RestaurantState {
        owners: owners.clone(),
        guard: Guard::with_ownership(Arc::new(owners)),
    };
    let create = guarded(
        Router::new().route("/api/v1/restaurants", post(create_restaurant)),
        trust.clone(),
        state.guard.clone(),
        Policy::AnyRole(RoleSet::from([Role::RestaurantOwner, Role::Admin])),
    );
    let read = guarded(
        Router::new().route("/api/v1/restaurants/{id}", get(get_restaurant)),
        trust,
        state.guard.clone(),
        Policy::Authenticated,
    );
    Router::new().merge(create).merge(read).with_state(state)
}

struct Topology {
    gateway: Router,
    identity: IdentityState,
}

async fn topology(codec: Arc<TokenCodec>) -> Topology {
    let identity = identity_state(codec.clone(), true);
    let identity_addr = spawn(identity_router(identity.clone())).await;
    let restaurant_addr = spawn(restaurant_router(TrustMode::GatewayHeaders)).await;

    let routes = RouteTable::from_csv(&format!(
        "/api/v1/auth=http://{identity_addr},/api/v1/users=http://{identity_addr},\
         /api/v1/restaurants=http://{restaurant_addr}"
    ))
    .unwrap();
    let allow = AllowList::from_csv(bytegate_api::config::DEFAULT_ALLOW_LIST).unwrap();
    let gateway = gateway_router(GatewayState {
        verifier: EdgeVerifier::new(codec, allow),
        forwarder: Forwarder::new(routes),
    });
    Topology { gateway, identity }
}

async fn login(gateway: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        gateway,
        request(
            "POST",
            "/api/v1/auth/login",
            &[],
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn customer_lifecycle_through_gateway() {
    let t = topology(codec(3)).await;

    let (status, body) = send(
        &t.gateway,
        request("POST", "/api/v1/auth/register", &[], Some(register_body("alice@example.com"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "CUSTOMER");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let auth = bearer(&token);

    // Customers cannot create restaurants.
    let (status, body) = send(
        &t.gateway,
        request("POST", "/api/v1/restaurants", &[("authorization", auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = login(&t.gateway, "alice@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &t.gateway,
        request("GET", "/api/v1/users/me", &[("authorization", auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");

    // Allow-listed at the edge, verified by the identity service itself.
    let (status, body) = send(
        &t.gateway,
        request("GET", "/api/v1/auth/check-roles", &[("authorization", auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], json!(["CUSTOMER"]));

    tokio::time::sleep(std::time::Duration::from_secs(4)).await;

    let (status, _) = send(
        &t.gateway,
        request("GET", "/api/v1/users/me", &[("authorization", auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ownership_is_enforced_downstream() {
    let t = topology(codec(300)).await;
    let (_, owner_token) = user_with_role(&t.identity, "owner@example.com", Role::RestaurantOwner).await;
    let (_, rival_token) = user_with_role(&t.identity, "rival@example.com", Role::RestaurantOwner).await;
    let (_, admin_token) = user_with_role(&t.identity, "admin@example.com", Role::Admin).await;
    let (owner_auth, rival_auth, admin_auth) =
        (bearer(&owner_token), bearer(&rival_token), bearer(&admin_token));

    let (status, body) = send(
        &t.gateway,
        request("POST", "/api/v1/restaurants", &[("authorization", owner_auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/restaurants/{}", body["id"].as_str().unwrap());

    let fetch = |auth: &str| request("GET", &uri, &[("authorization", auth)], None);
    assert_eq!(send(&t.gateway, fetch(&owner_auth)).await.0, StatusCode::OK);
    assert_eq!(send(&t.gateway, fetch(&rival_auth)).await.0, StatusCode::FORBIDDEN);
    assert_eq!(send(&t.gateway, fetch(&admin_auth)).await.0, StatusCode::OK);

    // Unknown restaurants fail closed.
    let ghost = format!("/api/v1/restaurants/{}", Uuid::now_v7());
    let (status, _) = send(
        &t.gateway,
        request("GET", &ghost, &[("authorization", owner_auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn promotion_applies_on_next_login() {
    let t = topology(codec(300)).await;
    let (user_id, old_token) = user_with_role(&t.identity, "alice@example.com", Role::Customer).await;
    t.identity
        .issuer
        .reassign_role(user_id, Role::RestaurantOwner)
        .await
        .unwrap();

    // The old token still carries CUSTOMER.
    let old_auth = bearer(&old_token);
    let (status, _) = send(
        &t.gateway,
        request("POST", "/api/v1/restaurants", &[("authorization", old_auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = login(&t.gateway, "alice@example.com", PASSWORD).await;
    assert_eq!(body["data"]["role"], "RESTAURANT_OWNER");
    let new_auth = bearer(body["data"]["token"].as_str().unwrap());
    let (status, _) = send(
        &t.gateway,
        request("POST", "/api/v1/restaurants", &[("authorization", new_auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn backend_reached_directly_verifies_tokens() {
    let codec = codec(300);
    let state = identity_state(codec.clone(), false);
    let (owner_id, token) = user_with_role(&state, "owner@example.com", Role::RestaurantOwner).await;
    let backend = restaurant_router(TrustMode::VerifyToken(codec));
    let auth = bearer(&token);

    let (status, body) = send(
        &backend,
        request("POST", "/api/v1/restaurants", &[("authorization", auth.as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"], owner_id.to_string());

    // Without the gateway in front, injected headers carry no weight.
    let (status, _) = send(
        &backend,
        request(
            "POST",
            "/api/v1/restaurants",
            &[("x-user-id", owner_id.to_string().as_str()), ("x-user-roles", "ADMIN")],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
