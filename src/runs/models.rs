use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::models::RunConfig;

/// Run status enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl FromStr for RunStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// One execution of the agent against a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub user_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    /// Create a new pending run
    pub fn new(thread_id: String, assistant_id: String, user_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id,
            assistant_id,
            user_id,
            status: RunStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

/// Authenticated caller plus the resolved thread and assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub user_id: String,
    pub thread_id: String,
    pub assistant_id: String,
}

/// Validated input and effective config, ready to execute
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub identity: RunIdentity,
    pub input: Vec<Map<String, Value>>,
    pub config: RunConfig,
}

impl PreparedRun {
    /// Input as the JSON array handed to the agent
    pub fn input_value(&self) -> Value {
        Value::Array(self.input.iter().cloned().map(Value::Object).collect())
    }
}

/// One unit of a live run as seen by the stream encoder
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Run identifier, sent before any snapshot
    Metadata { run_id: String },
    /// Incremental state snapshot produced by the agent
    Snapshot(Value),
    /// Terminal failure; nothing follows it
    Error { message: String },
    /// Natural completion; nothing follows it
    End,
}
