//! Domain models shared by the issuer, the verifier and the guard.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `bytegate_api::models`.

pub mod identity;
pub mod role;
pub mod token;

pub use identity::Identity;
pub use role::{Role, RoleSet, UnknownRole};
pub use token::{TokenClaims, VerifiedContext};
