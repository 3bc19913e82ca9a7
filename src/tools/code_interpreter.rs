use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::models::ToolKind;
use super::registry::ToolRuntime;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(60);

/// `configurable` key through which the agent finds its sandbox
pub const SANDBOX_ID_KEY: &str = "sandbox_id";

/// Sandbox session handed back by the sandbox service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSession {
    pub sandbox_id: String,
}

/// Code-execution sandbox shared by every run in the process.
///
/// The first `start()` provisions a session; concurrent callers wait on the
/// same provisioning and later callers return immediately. A failed
/// provisioning leaves the handle unstarted so the next run retries.
pub struct CodeInterpreter {
    client: Client,
    base_url: String,
    session: OnceCell<SandboxSession>,
}

impl CodeInterpreter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: OnceCell::new(),
        }
    }

    /// Currently provisioned session, if started
    pub fn session(&self) -> Option<&SandboxSession> {
        self.session.get()
    }

    async fn provision(&self) -> Result<SandboxSession> {
        let url = format!("{}/sandboxes", self.base_url);
        tracing::info!("Provisioning code interpreter sandbox at {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(PROVISION_TIMEOUT)
            .json(&serde_json::json!({ "kind": ToolKind::CodeInterpreter.as_str() }))
            .send()
            .await
            .map_err(|e| anyhow!("Sandbox request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Sandbox service error ({}): {}", status, text));
        }

        let session: SandboxSession = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse sandbox response: {}", e))?;

        tracing::info!("Code interpreter sandbox {} is ready", session.sandbox_id);
        Ok(session)
    }
}

#[async_trait]
impl ToolRuntime for CodeInterpreter {
    fn kind(&self) -> ToolKind {
        ToolKind::CodeInterpreter
    }

    async fn start(&self) -> Result<()> {
        self.session.get_or_try_init(|| self.provision()).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(session) = self.session.get() else {
            return Ok(());
        };

        let url = format!("{}/sandboxes/{}", self.base_url, session.sandbox_id);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to release sandbox {} ({})",
                session.sandbox_id,
                response.status()
            ));
        }

        tracing::info!("Released code interpreter sandbox {}", session.sandbox_id);
        Ok(())
    }

    fn run_config(&self) -> Map<String, Value> {
        let mut values = Map::new();
        if let Some(session) = self.session() {
            values.insert(SANDBOX_ID_KEY.to_string(), Value::String(session.sandbox_id.clone()));
        }
        values
    }
}
