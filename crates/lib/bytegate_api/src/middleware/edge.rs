//! Edge verifier: the gateway's perimeter check.
//!
//! Per request: `NoAuth → HeaderPresent → Decoded → Enriched`, or `Rejected`
//! from any of the first three. Allow-listed paths skip verification. Trust
//! headers supplied by the client are removed on every path before anything
//! else happens, then set from the decoded token on success.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytegate_core::allow_list::AllowList;
use bytegate_core::auth::TokenError;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::models::VerifiedContext;
use tracing::{debug, warn};

use super::{HEADER_USER_ID, HEADER_USER_ROLES, HEADER_USER_SUBJECT, TRUST_HEADERS, extract_bearer};
use crate::error::{AppError, UNAUTHENTICATED};

/// Why a request was turned away. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingToken,
    Token(TokenError),
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "missing_token",
            Rejection::Token(kind) => kind.as_str(),
        }
    }
}

/// Outcome of the perimeter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Allow-listed; forwarded without verification.
    Bypass,
    /// Token verified; trust headers set from this context.
    Enriched(VerifiedContext),
    Rejected(Rejection),
}

#[derive(Clone)]
pub struct EdgeVerifier {
    codec: Arc<TokenCodec>,
    allow_list: Arc<AllowList>,
}

impl EdgeVerifier {
    pub fn new(codec: Arc<TokenCodec>, allow_list: AllowList) -> Self {
        Self {
            codec,
            allow_list: Arc::new(allow_list),
        }
    }

    /// Decide what happens to a request for `path` carrying `headers`.
    pub fn classify(&self, path: &str, headers: &HeaderMap) -> Verdict {
        if self.allow_list.matches(path) {
            return Verdict::Bypass;
        }
        let Some(token) = extract_bearer(headers) else {
            return Verdict::Rejected(Rejection::MissingToken);
        };
        match self.codec.decode(token) {
            Ok(claims) => Verdict::Enriched(claims.into()),
            Err(kind) => Verdict::Rejected(Rejection::Token(kind)),
        }
    }

    /// Strip client-supplied trust headers, classify, and on success write
    /// the verified identity into the outbound headers.
    pub fn apply(&self, request: &mut Request) -> Verdict {
        let headers = request.headers_mut();
        for name in TRUST_HEADERS {
            headers.remove(name);
        }
        let verdict = self.classify(request.uri().path(), request.headers());
        if let Verdict::Enriched(ctx) = &verdict {
            inject(request.headers_mut(), ctx);
        }
        verdict
    }
}

fn inject(headers: &mut HeaderMap, ctx: &VerifiedContext) {
    // Uuid text and role names are always valid header values.
    if let Ok(v) = HeaderValue::from_str(&ctx.user_id.to_string()) {
        headers.insert(HEADER_USER_ID, v);
    }
    if let Ok(v) = HeaderValue::from_str(&ctx.roles.to_header_value()) {
        headers.insert(HEADER_USER_ROLES, v);
    }
    match HeaderValue::from_str(&ctx.subject) {
        Ok(v) => {
            headers.insert(HEADER_USER_SUBJECT, v);
        }
        Err(_) => debug!(user_id = %ctx.user_id, "subject not representable as a header, omitted"),
    }
}

/// Axum middleware. Must be the outermost layer of the gateway router so it
/// runs before anything else touches the request.
pub async fn verify_edge(
    State(verifier): State<EdgeVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match verifier.apply(&mut request) {
        Verdict::Bypass => {
            debug!(%path, "allow-listed, forwarding unverified");
            next.run(request).await
        }
        Verdict::Enriched(ctx) => {
            debug!(%path, user_id = %ctx.user_id, roles = %ctx.roles, "token verified");
            next.run(request).await
        }
        Verdict::Rejected(rejection) => {
            warn!(%path, reason = rejection.as_str(), "rejected at edge");
            AppError::Unauthorized(UNAUTHENTICATED.into()).into_response()
        }
    }
}
