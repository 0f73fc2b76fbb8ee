//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::{ApiResponse, ComponentHealth, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
///
/// Probes the metadata store and blob storage; answers 503 when either fails.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<DetailedHealthResponse>>) {
    let (database, storage) = tokio::join!(
        state.stores.health.health_check(),
        state.storage.health_check()
    );

    let database = ComponentHealth {
        backend: state.stores.health.backend_name().to_string(),
        healthy: probe("database", database),
    };
    let storage = ComponentHealth {
        backend: state.storage.provider_type().to_string(),
        healthy: probe("storage", storage),
    };

    let healthy = database.healthy && storage.healthy;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::ok(DetailedHealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            database,
            storage,
        })),
    )
}

fn probe(component: &str, result: defdrive_core::AppResult<bool>) -> bool {
    match result {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!(component, error = %e, "Health probe failed");
            false
        }
    }
}
