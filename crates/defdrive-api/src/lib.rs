//! # defdrive-api
//!
//! HTTP API layer for DefDrive built on Axum.
//!
//! Provides the owner-facing REST endpoints under `/api`, the public
//! `/link/{link}` serving endpoint, middleware (CORS, logging, timeouts),
//! extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
