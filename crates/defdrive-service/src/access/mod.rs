//! Owner-facing access record management.

pub mod service;

pub use service::{AccessService, AccessSettings, CreatedAccess};
