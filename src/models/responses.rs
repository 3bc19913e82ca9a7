use serde::Serialize;

use crate::runs::RunStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub active_runs: usize,
}

#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub status: String,
}

impl GenericResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Acknowledgment for a background run
#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub status: String,
    pub run_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelRunResponse {
    pub run_id: String,
    pub status: RunStatus,
}
