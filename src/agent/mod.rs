pub mod runtime_client;
pub mod schema;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RunConfig;

pub use runtime_client::RuntimeAgent;

/// Ordered sequence of state snapshots produced by one streaming run
pub type SnapshotStream = BoxStream<'static, Result<Value>>;

/// Agent variants a configuration can select
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Tool-calling agent
    #[default]
    Agent,
    /// Plain chat, no tools
    Chatbot,
    /// Chat over retrieved documents
    ChatRetrieval,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Agent => "agent",
            AgentType::Chatbot => "chatbot",
            AgentType::ChatRetrieval => "chat_retrieval",
        }
    }

    /// Whether the variant can call tools (and so receive tool messages)
    pub fn uses_tools(&self) -> bool {
        matches!(self, AgentType::Agent)
    }
}

/// The executable behind a run. Its reasoning is opaque to this service;
/// only the declared schemas and the two execution entry points are used.
#[async_trait]
pub trait Agent: Send + Sync {
    /// JSON Schema for the run input. With a config the schema is narrowed to
    /// the selected agent variant; without one it accepts every variant.
    fn input_schema(&self, config: Option<&RunConfig>) -> Value {
        let agent_type = config.and_then(|c| c.agent_type().ok());
        schema::input_schema(agent_type)
    }

    fn output_schema(&self) -> Value {
        schema::output_schema()
    }

    fn config_schema(&self) -> Value {
        schema::config_schema()
    }

    /// Run to completion and return the final state
    async fn invoke(&self, input: Value, config: &RunConfig) -> Result<Value>;

    /// Run and yield incremental state snapshots in production order
    async fn stream(&self, input: Value, config: &RunConfig) -> Result<SnapshotStream>;
}
