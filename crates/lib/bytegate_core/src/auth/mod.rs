//! Authentication logic.
//!
//! Signing key handling, the token codec, credential hashing, the credential
//! store and the identity issuer. Shared by the identity service, the edge
//! gateway and every backend that re-verifies tokens itself.

pub mod issuer;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod signing_key;
pub mod store;

use thiserror::Error;

/// Why a token failed to decode.
///
/// Kept precise for logging; callers at the perimeter collapse all three into
/// a single unauthenticated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

impl TokenError {
    /// Stable label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
        }
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
