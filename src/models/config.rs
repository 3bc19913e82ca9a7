use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::AgentType;
use crate::tools::ToolConfig;

pub const USER_ID_KEY: &str = "user_id";
pub const THREAD_ID_KEY: &str = "thread_id";
pub const ASSISTANT_ID_KEY: &str = "assistant_id";
pub const TOOLS_KEY: &str = "tools";
pub const AGENT_TYPE_KEY: &str = "type";

/// Effective configuration of a single run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub configurable: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunConfig {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.configurable.get(key).and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get_str(USER_ID_KEY)
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.get_str(THREAD_ID_KEY)
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.get_str(ASSISTANT_ID_KEY)
    }

    /// Typed view of the merged tool selection (absent = no tools)
    pub fn tools(&self) -> Result<Vec<ToolConfig>, serde_json::Error> {
        match self.configurable.get(TOOLS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()),
        }
    }

    /// Agent variant selected by the configuration (absent = default agent)
    pub fn agent_type(&self) -> Result<AgentType, serde_json::Error> {
        match self.configurable.get(AGENT_TYPE_KEY) {
            None | Some(Value::Null) => Ok(AgentType::default()),
            Some(value) => serde_json::from_value(value.clone()),
        }
    }
}

/// Caller-supplied config override; only `configurable` is honored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfigOverride {
    #[serde(default)]
    pub configurable: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub ignored: Map<String, Value>,
}
