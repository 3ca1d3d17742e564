//! Edge gateway: allow-list bypass, rejection, header enrichment and
//! forwarding against a live upstream that echoes what it received.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::{Json, Router};
use bytegate_api::middleware::edge::EdgeVerifier;
use bytegate_api::services::proxy::{Forwarder, RouteTable};
use bytegate_api::{GatewayState, gateway_router};
use bytegate_core::allow_list::AllowList;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::auth::signing_key::SigningKey;
use bytegate_core::models::{Identity, Role};
use chrono::{Duration, Utc};
use common::*;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

async fn echo(State(hits): State<Hits>, request: Request) -> Json<Value> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = request.into_parts();
    let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
    let mut seen = json!({
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "userId": header("x-user-id"),
        "roles": header("x-user-roles"),
        "subject": header("x-user-subject"),
        "authorization": header("authorization"),
    });
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    seen["body"] = Value::String(String::from_utf8_lossy(&body).into_owned());
    Json(seen)
}

struct Harness {
    app: Router,
    codec: Arc<TokenCodec>,
    hits: Hits,
}

async fn harness() -> Harness {
    let hits = Hits::default();
    let upstream = spawn(Router::new().fallback(echo).with_state(hits.clone())).await;
    let dead = dead_addr().await;

    let codec = codec(300);
    let routes = RouteTable::from_csv(&format!(
        "/api/v1/auth=http://{upstream},/api/v1/users=http://{upstream},/api/v1/orders=http://{dead}"
    ))
    .unwrap();
    let allow = AllowList::from_csv("/api/v1/auth/**,/actuator/**,/error").unwrap();
    let app = gateway_router(GatewayState {
        verifier: EdgeVerifier::new(codec.clone(), allow),
        forwarder: Forwarder::new(routes),
    });
    Harness { app, codec, hits }
}

fn token_for(codec: &TokenCodec, role: Role) -> (Identity, String) {
    let mut identity = Identity::new("alice@example.com", "Alice", "$2b$hash").unwrap();
    identity.assign_role(role);
    let token = codec.issue(&identity, Utc::now()).unwrap();
    (identity, token)
}

#[tokio::test]
async fn allow_listed_path_is_forwarded_without_token() {
    let h = harness().await;
    let (status, body) = send(
        &h.app,
        request(
            "POST",
            "/api/v1/auth/login?next=home",
            &[("x-user-id", "00000000-0000-0000-0000-000000000000"), ("x-user-roles", "ADMIN")],
            Some(json!({ "email": "alice@example.com" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "POST");
    assert_eq!(body["uri"], "/api/v1/auth/login?next=home");
    assert!(body["body"].as_str().unwrap().contains("alice@example.com"));
    // Spoofed trust headers never reach the upstream.
    assert_eq!(body["userId"], Value::Null);
    assert_eq!(body["roles"], Value::Null);
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn protected_path_without_token_never_reaches_upstream() {
    let h = harness().await;
    let (status, body) = send(&h.app, request("GET", "/api/v1/users/me", &[], None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn verified_request_is_enriched() {
    let h = harness().await;
    let (identity, token) = token_for(&h.codec, Role::RestaurantOwner);

    let (status, body) = send(
        &h.app,
        request(
            "GET",
            "/api/v1/users/me",
            &[
                ("authorization", bearer(&token).as_str()),
                ("x-user-id", "00000000-0000-0000-0000-000000000000"),
                ("x-user-roles", "ADMIN"),
            ],
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], identity.id.to_string());
    assert_eq!(body["roles"], "RESTAURANT_OWNER");
    assert_eq!(body["subject"], "alice@example.com");
    assert_eq!(body["authorization"], bearer(&token));
}

#[tokio::test]
async fn every_token_failure_looks_the_same() {
    let h = harness().await;
    let (identity, good) = token_for(&h.codec, Role::Customer);

    let expired = h
        .codec
        .encode(&identity, Utc::now() - Duration::hours(2), Duration::hours(1))
        .unwrap();
    let foreign_key = SigningKey::new("Zq7Wm3Kx9Rt2Vb6Np4Ls8Hd1Fg5Jc0Ya").unwrap();
    let forged = TokenCodec::new(&foreign_key, Duration::minutes(5))
        .issue(&identity, Utc::now())
        .unwrap();
    let mut tampered = good.clone();
    tampered.pop();
    tampered.push(if good.ends_with('A') { 'B' } else { 'A' });

    let mut bodies = Vec::new();
    for token in [expired, forged, tampered, "garbage".to_string()] {
        let (status, body) = send(
            &h.app,
            request("GET", "/api/v1/users/me", &[("authorization", bearer(&token).as_str())], None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn traversal_out_of_allow_list_is_rejected() {
    let h = harness().await;
    let (status, _) = send(&h.app, request("GET", "/api/v1/auth/../users/me", &[], None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn encoded_dot_segments_do_not_escape_allow_list() {
    let h = harness().await;
    for path in [
        "/api/v1/auth/%2e%2e/users/me",
        "/api/v1/auth/%2E%2E/users/me",
        "/api/v1/auth/.%2e/users/me",
        "/api/v1/auth/..%2fusers/me",
    ] {
        let (status, body) = send(&h.app, request("GET", path, &[], None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["error"], "unauthorized");
    }
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn verified_request_with_dot_segments_is_not_forwarded() {
    let h = harness().await;
    let (_, token) = token_for(&h.codec, Role::Customer);
    for path in ["/api/v1/users/%2e%2e/orders/1", "/api/v1/users/../auth/login"] {
        let (status, body) = send(
            &h.app,
            request("GET", path, &[("authorization", bearer(&token).as_str())], None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"], "validation_error");
    }
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let h = harness().await;
    let (_, token) = token_for(&h.codec, Role::Customer);
    let (status, body) = send(
        &h.app,
        request("GET", "/api/v1/payments/1", &[("authorization", bearer(&token).as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn dead_upstream_is_bad_gateway() {
    let h = harness().await;
    let (_, token) = token_for(&h.codec, Role::Customer);
    let (status, body) = send(
        &h.app,
        request("GET", "/api/v1/orders/1", &[("authorization", bearer(&token).as_str())], None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "bad_gateway");
}

#[tokio::test]
async fn gateway_health_is_local() {
    let h = harness().await;
    let (status, body) = send(&h.app, request("GET", "/actuator/health", &[], None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(h.hits.0.load(Ordering::SeqCst), 0);
}
