//! Effective run configuration.
//!
//! Precedence, lowest to highest: assistant outer config, assistant
//! `configurable`, request `configurable` override, then the identity triple.
//! The identity keys always come from the authenticated caller and the
//! resolved thread/assistant, never from the request.

use serde_json::Value;

use crate::models::{
    AssistantConfig, RunConfig, RunConfigOverride, ASSISTANT_ID_KEY, THREAD_ID_KEY, USER_ID_KEY,
};

use super::models::RunIdentity;

pub fn resolve(
    assistant_config: &AssistantConfig,
    overrides: Option<&RunConfigOverride>,
    identity: &RunIdentity,
) -> RunConfig {
    let mut configurable = assistant_config.configurable.to_map();

    if let Some(values) = overrides.and_then(|o| o.configurable.as_ref()) {
        for (key, value) in values {
            configurable.insert(key.clone(), value.clone());
        }
    }

    configurable.insert(USER_ID_KEY.to_string(), Value::String(identity.user_id.clone()));
    configurable.insert(THREAD_ID_KEY.to_string(), Value::String(identity.thread_id.clone()));
    configurable.insert(
        ASSISTANT_ID_KEY.to_string(),
        Value::String(identity.assistant_id.clone()),
    );

    RunConfig {
        configurable,
        extra: assistant_config.extra.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;
    use serde_json::json;

    fn identity() -> RunIdentity {
        RunIdentity {
            user_id: "user-1".into(),
            thread_id: "thread-1".into(),
            assistant_id: "assistant-1".into(),
        }
    }

    fn assistant_config() -> AssistantConfig {
        serde_json::from_value(json!({
            "recursion_limit": 50,
            "configurable": {
                "type": "agent",
                "system_message": "You are helpful",
                "tools": [{ "type": "retrieval" }]
            }
        }))
        .unwrap()
    }

    fn overrides(configurable: Value) -> RunConfigOverride {
        serde_json::from_value(json!({ "configurable": configurable })).unwrap()
    }

    #[test]
    fn test_assistant_config_only() {
        let config = resolve(&assistant_config(), None, &identity());

        assert_eq!(config.extra.get("recursion_limit"), Some(&json!(50)));
        assert_eq!(config.get_str("system_message"), Some("You are helpful"));
        assert_eq!(config.tools().unwrap()[0].kind, ToolKind::Retrieval);
        assert_eq!(config.user_id(), Some("user-1"));
        assert_eq!(config.thread_id(), Some("thread-1"));
        assert_eq!(config.assistant_id(), Some("assistant-1"));
    }

    #[test]
    fn test_override_wins_key_by_key() {
        let o = overrides(json!({
            "system_message": "Be terse",
            "temperature": 0.1
        }));
        let config = resolve(&assistant_config(), Some(&o), &identity());

        assert_eq!(config.get_str("system_message"), Some("Be terse"));
        assert_eq!(config.configurable.get("temperature"), Some(&json!(0.1)));
        // untouched keys survive
        assert_eq!(config.get_str("type"), Some("agent"));
        assert_eq!(config.tools().unwrap().len(), 1);
    }

    #[test]
    fn test_override_cannot_spoof_identity() {
        let o = overrides(json!({
            "user_id": "attacker",
            "thread_id": "someone-elses-thread",
            "assistant_id": "other-assistant"
        }));
        let config = resolve(&assistant_config(), Some(&o), &identity());

        assert_eq!(config.user_id(), Some("user-1"));
        assert_eq!(config.thread_id(), Some("thread-1"));
        assert_eq!(config.assistant_id(), Some("assistant-1"));
    }

    #[test]
    fn test_outer_override_keys_are_ignored() {
        let o: RunConfigOverride = serde_json::from_value(json!({
            "recursion_limit": 1,
            "configurable": null
        }))
        .unwrap();
        let config = resolve(&assistant_config(), Some(&o), &identity());

        assert_eq!(config.extra.get("recursion_limit"), Some(&json!(50)));
    }

    #[test]
    fn test_override_can_replace_tool_selection() {
        let o = overrides(json!({ "tools": [{ "type": "code_interpreter" }] }));
        let config = resolve(&assistant_config(), Some(&o), &identity());

        let tools = config.tools().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].kind, ToolKind::CodeInterpreter);
    }

    #[test]
    fn test_unlisted_tool_keys_reach_the_run() {
        let assistant: AssistantConfig = serde_json::from_value(json!({
            "configurable": {
                "tools": [{ "type": "retrieval", "multi_use": true, "description": "docs" }]
            }
        }))
        .unwrap();
        let config = resolve(&assistant, None, &identity());

        let tool = &config.configurable["tools"][0];
        assert_eq!(tool["type"], "retrieval");
        assert_eq!(tool["multi_use"], true);
        assert_eq!(tool["description"], "docs");
    }
}
