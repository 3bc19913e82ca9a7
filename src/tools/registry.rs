use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::models::ToolKind;

/// External capability that must be online before a run that selects it can start
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    /// Kind of tool this runtime backs
    fn kind(&self) -> ToolKind;

    /// Bring the runtime online. Must be idempotent: calling it again once
    /// started (or concurrently with another caller) must not provision twice.
    async fn start(&self) -> Result<()>;

    /// Release the runtime on service shutdown
    async fn shutdown(&self) -> Result<()>;

    /// Values the agent needs to reach the started runtime, merged into the
    /// run's `configurable` mapping
    fn run_config(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Registry of tool runtimes, shared by every run in the process
pub struct ToolRuntimes {
    runtimes: HashMap<ToolKind, Arc<dyn ToolRuntime>>,
}

impl ToolRuntimes {
    pub fn new() -> Self {
        Self {
            runtimes: HashMap::new(),
        }
    }

    /// Register a runtime, replacing any previous one for the same kind
    pub fn register(&mut self, runtime: Arc<dyn ToolRuntime>) {
        self.runtimes.insert(runtime.kind(), runtime);
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn ToolRuntime>) -> Self {
        self.register(runtime);
        self
    }

    pub fn get(&self, kind: ToolKind) -> Option<&Arc<dyn ToolRuntime>> {
        self.runtimes.get(&kind)
    }

    /// Shut every runtime down, logging failures rather than stopping early
    pub async fn shutdown_all(&self) {
        for (kind, runtime) in &self.runtimes {
            if let Err(e) = runtime.shutdown().await {
                tracing::warn!("Failed to shut down {} runtime: {}", kind, e);
            }
        }
    }
}

impl Default for ToolRuntimes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRuntime {
        shutdowns: AtomicUsize,
    }

    #[async_trait]
    impl ToolRuntime for CountingRuntime {
        fn kind(&self) -> ToolKind {
            ToolKind::CodeInterpreter
        }

        async fn start(&self) -> Result<()> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_and_shutdown_all() {
        let runtime = Arc::new(CountingRuntime {
            shutdowns: AtomicUsize::new(0),
        });
        let runtimes = ToolRuntimes::new().with_runtime(runtime.clone());

        assert!(runtimes.get(ToolKind::CodeInterpreter).is_some());
        assert!(runtimes.get(ToolKind::Retrieval).is_none());

        runtimes.shutdown_all().await;
        assert_eq!(runtime.shutdowns.load(Ordering::SeqCst), 1);
    }
}
