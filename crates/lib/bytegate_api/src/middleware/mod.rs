//! Request middleware.
//!
//! `edge` runs in the gateway in front of everything. `identity` and `guard`
//! run inside backend services.

pub mod edge;
pub mod guard;
pub mod identity;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/// Verified user id, set by the edge gateway.
pub const HEADER_USER_ID: &str = "x-user-id";
/// Verified roles, comma-joined.
pub const HEADER_USER_ROLES: &str = "x-user-roles";
/// Verified subject (handle).
pub const HEADER_USER_SUBJECT: &str = "x-user-subject";

/// Every header the edge owns. Client-supplied values are always dropped.
pub const TRUST_HEADERS: [&str; 3] = [HEADER_USER_ID, HEADER_USER_ROLES, HEADER_USER_SUBJECT];

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token counts as absent.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_bearer(&headers("Bearer ")), None);
        assert_eq!(extract_bearer(&headers("Bearer")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
