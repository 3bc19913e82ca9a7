use anyhow::Result;
use std::sync::Arc;

use crate::agent::{Agent, RuntimeAgent};
use crate::config::Config;
use crate::feedback::FeedbackClient;
use crate::runs::{RunDispatcher, RunExecutor, ToolBootstrapper};
use crate::storage::Storage;
use crate::tools::{CodeInterpreter, ToolRuntimes};

/// Shared application state, built once at startup and torn down on stop
pub struct AppState {
    pub config: Config,

    /// Assistants, threads and run records
    pub storage: Storage,

    pub agent: Arc<dyn Agent>,

    /// External runtimes backing runtime-dependent tools
    pub tool_runtimes: Arc<ToolRuntimes>,

    /// Lookup, config resolution, validation and tool bootstrap
    pub dispatcher: RunDispatcher,

    /// Executes runs and tracks the in-flight ones
    pub executor: RunExecutor,

    /// Present only when feedback forwarding is enabled
    pub feedback: Option<FeedbackClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Storage,
        agent: Arc<dyn Agent>,
        tool_runtimes: ToolRuntimes,
    ) -> Self {
        let tool_runtimes = Arc::new(tool_runtimes);
        let dispatcher = RunDispatcher::new(
            storage.clone(),
            agent.clone(),
            ToolBootstrapper::new(tool_runtimes.clone()),
        );
        let executor = RunExecutor::new(agent.clone(), storage.clone(), config.run_timeout);
        let feedback = FeedbackClient::from_config(&config.feedback);

        Self {
            config,
            storage,
            agent,
            tool_runtimes,
            dispatcher,
            executor,
            feedback,
        }
    }

    /// Open storage and wire up the external services named in `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = Storage::open(&config.database_path)?;
        tracing::info!("Storage opened at {}", config.database_path.display());

        let mut tool_runtimes = ToolRuntimes::new();
        match &config.sandbox_url {
            Some(url) => {
                tracing::info!("Code interpreter sandbox at {}", url);
                tool_runtimes.register(Arc::new(CodeInterpreter::new(url.clone())));
            }
            None => tracing::warn!("SANDBOX_URL not set, code interpreter tool is unavailable"),
        }

        let agent: Arc<dyn Agent> = Arc::new(RuntimeAgent::new(config.agent_runtime_url.clone()));

        Ok(Self::new(config, storage, agent, tool_runtimes))
    }

    /// Cancel in-flight runs and release tool runtimes
    pub async fn shutdown(&self) {
        let active = self.executor.active_count();
        if active > 0 {
            tracing::info!("Cancelling {} in-flight run(s)", active);
        }
        self.executor.cancel_all();
        self.tool_runtimes.shutdown_all().await;
    }
}
