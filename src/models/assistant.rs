use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolConfig;

/// A named configuration template for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub assistant_id: String,
    pub user_id: String,
    pub name: String,
    pub config: AssistantConfig,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub public: bool,
}

/// A conversation context referencing an assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub user_id: String,
    pub assistant_id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// Stored assistant configuration.
///
/// Outer keys (recursion limits, tags, pipeline structure) are kept verbatim;
/// only `configurable` is merged per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub configurable: Configurable,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The per-assistant `configurable` mapping with its typed tool selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configurable {
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl Configurable {
    /// Flatten back into the open mapping form used by run configs
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.values.clone();
        map.insert(
            "tools".to_string(),
            serde_json::to_value(&self.tools).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        map
    }
}
