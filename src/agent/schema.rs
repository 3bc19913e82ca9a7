//! Declared input, output and config schemas of the agent, as JSON Schema values.

use serde_json::{json, Value};

use super::AgentType;
use crate::tools::ToolKind;

const BASE_ROLES: [&str; 3] = ["user", "assistant", "system"];
const BASE_TYPES: [&str; 3] = ["human", "ai", "system"];

/// Input schema: a list of open message records. `None` gives the union over
/// all agent variants.
pub fn input_schema(agent_type: Option<AgentType>) -> Value {
    let accepts_tool_messages = agent_type.map_or(true, |t| t.uses_tools());

    let mut roles: Vec<&str> = BASE_ROLES.to_vec();
    let mut types: Vec<&str> = BASE_TYPES.to_vec();
    if accepts_tool_messages {
        roles.push("tool");
        types.push("tool");
    }

    json!({
        "title": "AgentInput",
        "type": "array",
        "items": message_schema(&roles, &types),
    })
}

/// Output schema: the thread state after a run
pub fn output_schema() -> Value {
    let roles: Vec<&str> = BASE_ROLES.iter().copied().chain(["tool"]).collect();
    let types: Vec<&str> = BASE_TYPES.iter().copied().chain(["tool"]).collect();

    json!({
        "title": "AgentOutput",
        "type": "object",
        "properties": {
            "messages": {
                "type": "array",
                "items": message_schema(&roles, &types),
            }
        },
    })
}

/// Config schema: the `configurable` fields an assistant or request may set
pub fn config_schema() -> Value {
    let agent_types: Vec<&str> = [AgentType::Agent, AgentType::Chatbot, AgentType::ChatRetrieval]
        .iter()
        .map(AgentType::as_str)
        .collect();
    let tool_kinds: Vec<&str> = ToolKind::all().iter().map(ToolKind::as_str).collect();

    json!({
        "title": "AgentConfig",
        "type": "object",
        "properties": {
            "configurable": {
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": agent_types,
                        "default": AgentType::default().as_str(),
                    },
                    "system_message": { "type": "string" },
                    "llm_type": { "type": "string" },
                    "retrieval_description": { "type": "string" },
                    "tools": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "type": { "type": "string", "enum": tool_kinds },
                                "name": { "type": "string" },
                                "description": { "type": "string" },
                                "config": { "type": "object" },
                            },
                            "required": ["type"],
                        },
                        "default": [],
                    },
                },
            }
        },
    })
}

fn message_schema(roles: &[&str], types: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "anyOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": ["string", "object"] } },
                ]
            },
            "role": { "type": "string", "enum": roles },
            "type": { "type": "string", "enum": types },
            "name": { "type": "string" },
            "id": { "type": "string" },
            "tool_call_id": { "type": "string" },
        },
        "required": ["content"],
        "anyOf": [
            { "required": ["role"] },
            { "required": ["type"] },
        ],
        "additionalProperties": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(schema: &Value) -> Vec<String> {
        schema["items"]["properties"]["role"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_tool_messages_depend_on_agent_type() {
        assert!(roles(&input_schema(Some(AgentType::Agent))).contains(&"tool".to_string()));
        assert!(!roles(&input_schema(Some(AgentType::Chatbot))).contains(&"tool".to_string()));
        assert!(roles(&input_schema(None)).contains(&"tool".to_string()));
    }

    #[test]
    fn test_config_schema_lists_every_tool_kind() {
        let schema = config_schema();
        let kinds = schema["properties"]["configurable"]["properties"]["tools"]["items"]
            ["properties"]["type"]["enum"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(kinds, ToolKind::all().len());
    }
}
