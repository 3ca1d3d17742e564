//! Gateway forwarding: routes verified requests to upstream services.
//!
//! Upstreams are chosen by longest matching path prefix. The request is
//! forwarded with its method, path, query, body and end-to-end headers
//! (including the trust headers the edge just set); the upstream's response
//! is streamed back.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header},
    response::Response,
};
use bytegate_core::allow_list::safe_segments;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AppError;

/// Largest request body the gateway buffers before forwarding.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe a single connection and are never forwarded.
static HOP_BY_HOP: [header::HeaderName; 9] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("expected 'prefix=url', got '{0}'")]
    Syntax(String),
    #[error("route prefix must start with '/': {0}")]
    Prefix(String),
    #[error("upstream must be an http(s) URL: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub prefix: String,
    pub upstream: String,
}

impl Route {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }
}

/// Prefix → upstream table, longest prefix first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes }
    }

    /// Parse `"/a=http://host:1,/b=http://host:2"`.
    pub fn from_csv(csv: &str) -> Result<Self, RouteError> {
        let routes = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_route)
            .collect::<Result<_, _>>()?;
        Ok(Self::new(routes))
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

fn parse_route(entry: &str) -> Result<Route, RouteError> {
    let (prefix, upstream) = entry
        .split_once('=')
        .ok_or_else(|| RouteError::Syntax(entry.to_string()))?;
    let prefix = prefix.trim();
    let upstream = upstream.trim().trim_end_matches('/');
    if !prefix.starts_with('/') {
        return Err(RouteError::Prefix(prefix.to_string()));
    }
    let scheme_ok = upstream
        .strip_prefix("http://")
        .or_else(|| upstream.strip_prefix("https://"))
        .is_some_and(|host| !host.is_empty());
    if !scheme_ok {
        return Err(RouteError::Upstream(upstream.to_string()));
    }
    Ok(Route {
        prefix: prefix.to_string(),
        upstream: upstream.to_string(),
    })
}

/// HTTP client plus route table.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    routes: Arc<RouteTable>,
}

impl Forwarder {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            client: reqwest::Client::new(),
            routes: Arc::new(routes),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Forward `request` to the upstream owning its path.
    pub async fn forward(&self, request: Request) -> Result<Response, AppError> {
        let path = request.uri().path().to_string();
        // The client would resolve these before sending, so the upstream
        // path would differ from the one that was verified and routed.
        if safe_segments(&path).is_none() {
            warn!(%path, "dot or encoded separator segment, not forwarded");
            return Err(AppError::Validation("Invalid request path".into()));
        }
        let route = self
            .routes
            .resolve(&path)
            .ok_or_else(|| AppError::NotFound(format!("No route for {path}")))?;

        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path.as_str());
        let url = format!("{}{}", route.upstream, path_and_query);

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read request body: {e}")))?;

        debug!(%path, upstream = %route.upstream, method = %parts.method, "forwarding");
        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(end_to_end(parts.headers))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(%path, upstream = %route.upstream, error = %e, "upstream request failed");
                AppError::BadGateway(e.to_string())
            })?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(headers) = response.headers_mut() {
            *headers = end_to_end(upstream.headers().clone());
        }
        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| AppError::Internal(format!("Response build failed: {e}")))
    }
}

fn end_to_end(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers
}

/// Fallback handler for the gateway router.
pub async fn forward_handler(
    State(forwarder): State<Forwarder>,
    request: Request,
) -> Result<Response, AppError> {
    forwarder.forward(request).await
}
