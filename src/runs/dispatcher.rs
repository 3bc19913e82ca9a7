use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

use super::bootstrap::ToolBootstrapper;
use super::models::{PreparedRun, RunIdentity};
use super::{resolver, validator};
use crate::agent::Agent;
use crate::error::{AppError, Result};
use crate::models::CreateRunPayload;
use crate::storage::Storage;

/// Turns a run request into a validated, ready-to-execute run.
///
/// Stages run in a fixed order and the first failure wins: thread lookup,
/// assistant lookup, config resolution, validation, tool bootstrap.
#[derive(Clone)]
pub struct RunDispatcher {
    storage: Storage,
    agent: Arc<dyn Agent>,
    bootstrapper: ToolBootstrapper,
}

impl RunDispatcher {
    pub fn new(storage: Storage, agent: Arc<dyn Agent>, bootstrapper: ToolBootstrapper) -> Self {
        Self {
            storage,
            agent,
            bootstrapper,
        }
    }

    #[instrument(skip(self, payload), fields(thread_id = %payload.thread_id))]
    pub async fn prepare(&self, payload: &CreateRunPayload, user_id: &str) -> Result<PreparedRun> {
        let thread = self
            .storage
            .get_thread(user_id, &payload.thread_id)
            .map_err(|e| AppError::Storage(e.to_string()))?
            .ok_or(AppError::ThreadNotFound)?;

        let assistant = self
            .storage
            .get_assistant(user_id, &thread.assistant_id)
            .map_err(|e| AppError::Storage(e.to_string()))?
            .ok_or(AppError::AssistantNotFound)?;

        let identity = RunIdentity {
            user_id: user_id.to_string(),
            thread_id: thread.thread_id,
            assistant_id: assistant.assistant_id.clone(),
        };

        let mut config = resolver::resolve(&assistant.config, payload.config.as_ref(), &identity);

        validator::validate_config(&config).map_err(|errors| validation_error(errors, payload))?;

        let input: Vec<Map<String, Value>> = payload.input.clone().unwrap_or_default();
        if payload.input.is_some() {
            validator::validate_input(self.agent.as_ref(), &input, &config)
                .map_err(|errors| validation_error(errors, payload))?;
        }

        // validate_config above guarantees this parses
        let tools = config.tools().unwrap_or_default();
        let runtime_values = self.bootstrapper.ensure_tools_ready(&tools).await?;
        config.configurable.extend(runtime_values);

        tracing::debug!("Prepared run for assistant {}", identity.assistant_id);

        Ok(PreparedRun {
            identity,
            input,
            config,
        })
    }
}

fn validation_error(errors: Vec<validator::FieldError>, payload: &CreateRunPayload) -> AppError {
    AppError::Validation {
        errors,
        body: serde_json::to_value(payload).unwrap_or(Value::Null),
    }
}
