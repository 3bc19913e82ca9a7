use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::json_body;
use crate::api::auth::AuthedUser;
use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{CancelRunResponse, CreateRunPayload, CreateRunResponse};
use crate::runs::{encoder, Run, RunStatus};

/// Start a run in the background
pub async fn create_run(
    user: AuthedUser,
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateRunPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateRunResponse>)> {
    let payload = json_body(body)?;
    let prepared = state.dispatcher.prepare(&payload, &user.user_id).await?;
    let run_id = state.executor.spawn_background(prepared)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateRunResponse {
            status: "ok".to_string(),
            run_id,
        }),
    ))
}

/// Start a run and stream its state snapshots as server-sent events
pub async fn stream_run(
    user: AuthedUser,
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateRunPayload>, JsonRejection>,
) -> Result<Response> {
    let payload = json_body(body)?;
    let prepared = state.dispatcher.prepare(&payload, &user.user_id).await?;
    let (_, rx) = state.executor.stream(prepared)?;

    Ok(encoder::sse_response(encoder::encode(rx)))
}

pub async fn input_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.agent.input_schema(None))
}

pub async fn output_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.agent.output_schema())
}

pub async fn config_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.agent.config_schema())
}

/// Get a run by ID
pub async fn get_run(
    user: AuthedUser,
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Run>> {
    let run = state
        .storage
        .get_run(&user.user_id, &run_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or(AppError::RunNotFound(run_id))?;

    Ok(Json(run))
}

/// Cancel an in-flight run. Finished runs report their final status.
pub async fn cancel_run(
    user: AuthedUser,
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<CancelRunResponse>> {
    let run = state
        .storage
        .get_run(&user.user_id, &run_id)
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::RunNotFound(run_id.clone()))?;

    let status = if state.executor.cancel(&run_id) {
        RunStatus::Cancelled
    } else {
        run.status
    };

    Ok(Json(CancelRunResponse { run_id, status }))
}
