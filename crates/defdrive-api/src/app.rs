//! Application builder: wires router, middleware, and state into an Axum app.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use defdrive_core::config::AppConfig;
use defdrive_core::error::{AppError, ErrorKind};
use defdrive_database::store::Stores;
use defdrive_storage::LocalStorageProvider;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(request_logging))
}

/// Runs the DefDrive server until a shutdown signal arrives.
///
/// In-flight requests get `server.shutdown_grace_seconds` to finish; open
/// downloads still running after that are dropped.
pub async fn run_server(config: AppConfig, stores: Stores) -> Result<(), AppError> {
    tracing::info!(
        data_root = %config.storage.data_root,
        "Initializing local storage"
    );
    let storage = Arc::new(LocalStorageProvider::new(&config.storage.data_root).await?);

    let bind_addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(config, stores, storage);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to bind {bind_addr}: {e}"),
                e,
            )
        })?;
    tracing::info!(address = %bind_addr, "DefDrive listening");

    let shutdown = CancellationToken::new();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return flatten(joined),
        _ = shutdown_signal() => {}
    }

    tracing::info!(grace_seconds = grace.as_secs(), "Shutdown signal received, draining");
    shutdown.cancel();

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => flatten(joined)?,
        Err(_) => {
            tracing::warn!("Grace period elapsed, dropping remaining connections");
            server.abort();
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn flatten(joined: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::with_source(
            ErrorKind::Internal,
            format!("Server error: {e}"),
            e,
        )),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Internal,
            format!("Server task failed: {e}"),
            e,
        )),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
