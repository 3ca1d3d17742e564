//! Backend identity middleware: resolves the caller's verified context.
//!
//! A backend runs in exactly one [`TrustMode`]. Behind the gateway it trusts
//! the injected `X-User-*` headers; reached directly it re-verifies the bearer
//! token with the shared codec. Either way the result lands in request
//! extensions as [`AuthenticatedUser`], the only identity handlers may use.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use bytegate_core::auth::AuthError;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::models::{RoleSet, VerifiedContext};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{HEADER_USER_ID, HEADER_USER_ROLES, HEADER_USER_SUBJECT, extract_bearer};
use crate::error::AppError;

/// Verified caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub VerifiedContext);

#[derive(Clone)]
pub enum TrustMode {
    /// Identity comes from headers set by the edge gateway. Only safe when
    /// the service is unreachable except through the gateway.
    GatewayHeaders,
    /// Identity comes from re-decoding the bearer token.
    VerifyToken(Arc<TokenCodec>),
}

impl TrustMode {
    pub fn name(&self) -> &'static str {
        match self {
            TrustMode::GatewayHeaders => "gateway",
            TrustMode::VerifyToken(_) => "token",
        }
    }

    /// Resolve the caller from request headers.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<VerifiedContext, AuthError> {
        match self {
            TrustMode::GatewayHeaders => context_from_headers(headers),
            TrustMode::VerifyToken(codec) => {
                let token = extract_bearer(headers).ok_or(AuthError::Unauthenticated)?;
                Ok(codec.decode(token)?.into())
            }
        }
    }
}

/// Rebuild a [`VerifiedContext`] from edge-injected headers. Missing or
/// unparsable headers mean the request did not pass the edge.
pub fn context_from_headers(headers: &HeaderMap) -> Result<VerifiedContext, AuthError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let user_id = header(HEADER_USER_ID)
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(AuthError::Unauthenticated)?;
    let roles = header(HEADER_USER_ROLES)
        .and_then(|v| RoleSet::parse_header_value(v).ok())
        .filter(|r| !r.is_empty())
        .ok_or(AuthError::Unauthenticated)?;
    let subject = header(HEADER_USER_SUBJECT).unwrap_or_default().to_string();

    Ok(VerifiedContext {
        user_id,
        subject,
        roles,
    })
}

/// Axum middleware: resolves the caller per the configured [`TrustMode`] and
/// injects [`AuthenticatedUser`]; 401 otherwise.
pub async fn require_identity(
    State(mode): State<TrustMode>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = match mode.resolve(request.headers()) {
        Ok(ctx) => ctx,
        Err(e) => {
            let reason = match &e {
                AuthError::Token(kind) => kind.as_str(),
                _ => "missing_identity",
            };
            warn!(path = %request.uri().path(), mode = mode.name(), reason, "request not authenticated");
            return Err(e.into());
        }
    };
    debug!(user_id = %ctx.user_id, roles = %ctx.roles, "caller resolved");
    request.extensions_mut().insert(AuthenticatedUser(ctx));
    Ok(next.run(request).await)
}
