//! Services behind the handlers.

pub mod proxy;
