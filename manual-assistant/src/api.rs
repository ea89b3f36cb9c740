//! HTTP API for the manual assistant gateway.
//!
//! Every route except `/metrics` requires the shared API key header.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{I18nError, ServiceError};
use crate::service::GatewayService;

pub mod auth;
pub mod chat;
use auth::require_api_key;
use chat::{asistant_handler, basic_asistant_handler};

/// Application state
pub struct AppState {
    pub service: Arc<GatewayService>,
    pub api_key: String,
    pub metrics: PrometheusHandle,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<GatewayService>, api_key: String, metrics: PrometheusHandle) -> Self {
        Self {
            service,
            api_key,
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError) -> I18nError {
        I18nError::new(error, self.service.i18n().clone())
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/", get(health_handler))
        .route("/asistant", get(asistant_handler))
        .route("/basic_asistant", get(basic_asistant_handler))
        .route("/check-api-key", get(check_api_key_handler))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(protected)
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.service.i18n().text("health-status-healthy"),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

async fn check_api_key_handler() -> Json<CheckApiKeyResponse> {
    Json(CheckApiKeyResponse { valid: true })
}

#[derive(Serialize)]
struct CheckApiKeyResponse {
    valid: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
