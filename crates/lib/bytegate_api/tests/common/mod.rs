//! Shared helpers for router-level tests. Everything runs on the in-memory
//! credential store; no database needed.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytegate_api::IdentityState;
use bytegate_api::middleware::identity::TrustMode;
use bytegate_core::auth::issuer::IdentityIssuer;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::auth::memory::InMemoryCredentialStore;
use bytegate_core::auth::signing_key::SigningKey;
use bytegate_core::guard::{Guard, IdentityOwnership};
use bytegate_core::models::Role;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "J8Kq2mPvRx4TnZs9YwLcGf7DhBe3Xa6W";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn codec(ttl_secs: i64) -> Arc<TokenCodec> {
    let key = SigningKey::new(SECRET).unwrap();
    Arc::new(TokenCodec::new(&key, chrono::Duration::seconds(ttl_secs)))
}

/// Identity service state over a fresh in-memory store.
pub fn identity_state(codec: Arc<TokenCodec>, gateway_headers: bool) -> IdentityState {
    let store = Arc::new(InMemoryCredentialStore::new());
    let trust = if gateway_headers {
        TrustMode::GatewayHeaders
    } else {
        TrustMode::VerifyToken(codec.clone())
    };
    IdentityState {
        issuer: Arc::new(IdentityIssuer::new(store.clone(), codec).with_hash_cost(4)),
        guard: Guard::with_ownership(Arc::new(IdentityOwnership::new(store))),
        trust,
    }
}

/// Register `email`, optionally promote it, and log in again so the token
/// carries the current role. Returns `(user_id, token)`.
pub async fn user_with_role(state: &IdentityState, email: &str, role: Role) -> (Uuid, String) {
    let issued = state.issuer.register(email, "Test User", PASSWORD).await.unwrap();
    if role != Role::Customer {
        state.issuer.reassign_role(issued.user_id, role).await.unwrap();
    }
    let issued = state.issuer.login(email, PASSWORD).await.unwrap();
    (issued.user_id, issued.token)
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn register_body(email: &str) -> Value {
    json!({ "email": email, "name": "Alice Example", "password": PASSWORD })
}

/// Send one request through `app` and parse the JSON body (`Null` if empty
/// or not JSON).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
