//! Route definitions for the DefDrive HTTP API.
//!
//! Owner-facing routes are mounted under `/api`; the public serving route
//! lives at `/link/{link}`. The router receives `AppState` and passes it to
//! all handlers via Axum's `State` extractor.

use std::time::Duration;

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;

use crate::handlers;
use crate::middleware::timeout::handle_timeout_error;
use crate::state::AppState;

/// Allowance for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Build the route tree.
///
/// JSON endpoints are cut off after `server.request_timeout_seconds`.
/// Uploads and link downloads stream for as long as they need.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let body_limit = state
        .config
        .storage
        .max_upload_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let json_routes = Router::new()
        .merge(auth_routes())
        .merge(file_routes())
        .merge(access_routes())
        .merge(health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(timeout),
        );

    let upload_routes = Router::new()
        .route("/upload", post(handlers::file::upload))
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ));

    Router::new()
        .nest("/api", json_routes.merge(upload_routes))
        .route("/link/{link}", get(handlers::link::serve_link))
        .with_state(state)
}

/// Account endpoints
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
}

/// File listing, visibility, deletion
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(handlers::file::list_files))
        .route("/files/{file_id}", delete(handlers::file::delete_file))
        .route("/files/{file_id}/access", put(handlers::file::set_file_access))
}

/// Access record CRUD
fn access_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/files/{file_id}/accesses",
            post(handlers::access::create_access).get(handlers::access::list_accesses),
        )
        .route(
            "/accesses/{access_id}",
            get(handlers::access::get_access)
                .put(handlers::access::update_access)
                .delete(handlers::access::delete_access),
        )
        .route(
            "/accesses/{access_id}/access",
            put(handlers::access::update_access),
        )
}

/// Liveness and dependency probes
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
