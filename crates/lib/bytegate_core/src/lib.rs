//! # bytegate_core
//!
//! Distributed trust protocol for Bytegate: token issuance, stateless
//! verification and claim-based authorization. No HTTP in here; the axum
//! surface lives in `bytegate_api`.

pub mod allow_list;
pub mod auth;
pub mod guard;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
