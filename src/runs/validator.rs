use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::Agent;
use crate::models::{RunConfig, AGENT_TYPE_KEY, TOOLS_KEY};

/// One field-level violation, located from the request body root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn new(loc: Vec<Value>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Check the typed parts of the effective config that later stages rely on
pub fn validate_config(config: &RunConfig) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.tools() {
        errors.push(FieldError::new(
            config_loc(TOOLS_KEY),
            format!("Invalid tool selection: {}", e),
            "value_error",
        ));
    }
    if let Err(e) = config.agent_type() {
        errors.push(FieldError::new(
            config_loc(AGENT_TYPE_KEY),
            format!("Invalid agent type: {}", e),
            "value_error",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate run input against the agent's schema for this config
pub fn validate_input(
    agent: &dyn Agent,
    input: &[Map<String, Value>],
    config: &RunConfig,
) -> Result<(), Vec<FieldError>> {
    let schema = agent.input_schema(Some(config));
    let instance = Value::Array(input.iter().cloned().map(Value::Object).collect());
    validate_against(&schema, &instance)
}

/// Structural match of `instance` against a JSON Schema document
pub fn validate_against(schema: &Value, instance: &Value) -> Result<(), Vec<FieldError>> {
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|err| {
            vec![FieldError::new(
                vec![Value::from("schema")],
                format!("Invalid input schema: {}", err),
                "schema_error",
            )]
        })?;

    let result = compiled.validate(instance);
    if let Err(errors) = result {
        let errors = errors
            .map(|error| {
                let mut loc = input_loc(&error.instance_path.to_string());
                let kind = match &error.kind {
                    ValidationErrorKind::Required { property } => {
                        if let Some(name) = property.as_str() {
                            loc.push(Value::from(name));
                        }
                        "missing"
                    }
                    ValidationErrorKind::Type { .. } => "type_error",
                    ValidationErrorKind::Enum { .. } => "enum",
                    _ => "value_error",
                };
                FieldError::new(loc, error.to_string(), kind)
            })
            .collect::<Vec<_>>();
        return Err(errors);
    }

    Ok(())
}

/// `/0/content` -> ["body", "input", 0, "content"]
fn input_loc(pointer: &str) -> Vec<Value> {
    let mut loc = vec![Value::from("body"), Value::from("input")];
    loc.extend(
        pointer
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<u64>() {
                Ok(index) => Value::from(index),
                Err(_) => Value::from(segment.replace("~1", "/").replace("~0", "~")),
            }),
    );
    loc
}

fn config_loc(key: &str) -> Vec<Value> {
    vec![
        Value::from("body"),
        Value::from("config"),
        Value::from("configurable"),
        Value::from(key),
    ]
}
