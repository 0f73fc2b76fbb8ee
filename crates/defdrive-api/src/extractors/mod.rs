//! Custom Axum extractors.

pub mod auth;
pub mod client_ip;
pub mod json;

pub use auth::{AuthUser, OptionalAuthUser};
pub use client_ip::ClientIp;
pub use json::ValidatedJson;
