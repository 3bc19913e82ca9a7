use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::tools::{ToolConfig, ToolKind, ToolRuntimes};

/// Brings up the external runtimes a run's tool selection depends on
#[derive(Clone)]
pub struct ToolBootstrapper {
    runtimes: Arc<ToolRuntimes>,
}

impl ToolBootstrapper {
    pub fn new(runtimes: Arc<ToolRuntimes>) -> Self {
        Self { runtimes }
    }

    /// Start every runtime-backed tool in `tools`. Returns once all are ready
    /// or on the first failure; the run must not begin until this returns Ok.
    /// On success, yields the values the agent needs to reach those runtimes.
    pub async fn ensure_tools_ready(&self, tools: &[ToolConfig]) -> Result<Map<String, Value>> {
        let mut seen: HashSet<ToolKind> = HashSet::new();
        let mut values = Map::new();

        for tool in tools.iter().filter(|t| t.kind.requires_runtime()) {
            if !seen.insert(tool.kind) {
                continue;
            }

            let runtime = self.runtimes.get(tool.kind).ok_or_else(|| {
                AppError::Bootstrap(format!("no runtime configured for tool '{}'", tool.kind))
            })?;

            tracing::debug!("Starting {} runtime", tool.kind);
            runtime.start().await.map_err(|e| {
                tracing::error!("Failed to start {} runtime: {}", tool.kind, e);
                AppError::Bootstrap(format!("{}: {}", tool.kind, e))
            })?;
            values.extend(runtime.run_config());
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRuntime;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSandbox {
        starts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ToolRuntime for FakeSandbox {
        fn kind(&self) -> ToolKind {
            ToolKind::CodeInterpreter
        }

        async fn start(&self) -> anyhow::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("sandbox quota exceeded"))
            } else {
                Ok(())
            }
        }

        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn run_config(&self) -> Map<String, Value> {
            let mut values = Map::new();
            values.insert("sandbox_id".into(), Value::from("sbx-test"));
            values
        }
    }

    fn bootstrapper(fail: bool) -> (ToolBootstrapper, Arc<FakeSandbox>) {
        let sandbox = Arc::new(FakeSandbox {
            starts: AtomicUsize::new(0),
            fail,
        });
        let runtimes = ToolRuntimes::new().with_runtime(sandbox.clone());
        (ToolBootstrapper::new(Arc::new(runtimes)), sandbox)
    }

    #[tokio::test]
    async fn test_no_runtime_tools_is_noop() {
        let (bootstrapper, sandbox) = bootstrapper(false);
        let tools = vec![ToolConfig::new(ToolKind::Retrieval), ToolConfig::new(ToolKind::Wikipedia)];

        let values = bootstrapper.ensure_tools_ready(&tools).await.unwrap();
        assert_eq!(sandbox.starts.load(Ordering::SeqCst), 0);
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_code_interpreter_started_once_per_run() {
        let (bootstrapper, sandbox) = bootstrapper(false);
        let tools = vec![
            ToolConfig::new(ToolKind::CodeInterpreter),
            ToolConfig::new(ToolKind::CodeInterpreter),
        ];

        let values = bootstrapper.ensure_tools_ready(&tools).await.unwrap();
        assert_eq!(sandbox.starts.load(Ordering::SeqCst), 1);
        assert_eq!(values.get("sandbox_id"), Some(&Value::from("sbx-test")));
    }

    #[tokio::test]
    async fn test_start_failure_is_bootstrap_error() {
        let (bootstrapper, _) = bootstrapper(true);
        let tools = vec![ToolConfig::new(ToolKind::CodeInterpreter)];

        let err = bootstrapper.ensure_tools_ready(&tools).await.unwrap_err();
        assert!(matches!(err, AppError::Bootstrap(_)));
    }

    #[tokio::test]
    async fn test_missing_runtime_is_bootstrap_error() {
        let bootstrapper = ToolBootstrapper::new(Arc::new(ToolRuntimes::new()));
        let tools = vec![ToolConfig::new(ToolKind::CodeInterpreter)];

        let err = bootstrapper.ensure_tools_ready(&tools).await.unwrap_err();
        assert!(matches!(err, AppError::Bootstrap(_)));
    }
}
