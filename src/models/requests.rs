use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::config::RunConfigOverride;

/// Payload for creating a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunPayload {
    pub thread_id: String,
    /// Message-like records; absent means "no new input" and skips validation
    #[serde(default)]
    pub input: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub config: Option<RunConfigOverride>,
}

/// Feedback on an individual run, forwarded to the tracing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCreateRequest {
    pub run_id: Uuid,
    pub key: String,
    /// Numeric or boolean score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
