use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{feedback, health, runs};
use super::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Runs endpoints
        .route("/runs", post(runs::create_run))
        .route("/runs/stream", post(runs::stream_run))
        .route("/runs/input_schema", get(runs::input_schema))
        .route("/runs/output_schema", get(runs::output_schema))
        .route("/runs/config_schema", get(runs::config_schema))
        .route("/runs/feedback", post(feedback::create_run_feedback))
        .route("/runs/:run_id", get(runs::get_run))
        .route("/runs/:run_id/cancel", post(runs::cancel_run))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
