use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use super::json_body;
use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{FeedbackCreateRequest, GenericResponse};

/// Forward feedback on a run to the tracing service.
///
/// Delivery happens in the background; an ok response only means the
/// request was well formed. Without a configured tracing service the
/// route answers 404 before the body is read.
pub async fn create_run_feedback(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<FeedbackCreateRequest>, JsonRejection>,
) -> Result<Json<GenericResponse>> {
    let client = state.feedback.clone().ok_or(AppError::FeedbackDisabled)?;
    let request = json_body(body)?;

    tokio::spawn(async move {
        if let Err(e) = client.create_feedback(&request).await {
            tracing::warn!("Failed to deliver feedback for run {}: {}", request.run_id, e);
        }
    });

    Ok(Json(GenericResponse::ok()))
}
