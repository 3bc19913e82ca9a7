use anyhow::Result;
use dashmap::DashMap;
use futures_util::{FutureExt, StreamExt};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::models::{PreparedRun, Run, RunStatus, StreamEvent};
use crate::agent::Agent;
use crate::models::RunConfig;
use crate::storage::Storage;

/// Capacity of the per-run event channel. The agent stream is only pulled
/// while the client keeps up.
const STREAM_BUFFER: usize = 16;

/// Message sent to the client in place of internal error details
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
const TIMEOUT_MESSAGE: &str = "Run timed out";
const CANCELLED_MESSAGE: &str = "Run cancelled";
const PANIC_MESSAGE: &str = "Agent panicked";

/// How a run ended
#[derive(Debug)]
enum Outcome {
    Completed,
    Failed(String),
    TimedOut,
    Cancelled,
    /// Streaming client went away
    Disconnected,
}

/// Executes prepared runs, either detached or as a live snapshot stream,
/// and keeps the cancellation handle of every in-flight run.
#[derive(Clone)]
pub struct RunExecutor {
    agent: Arc<dyn Agent>,
    storage: Storage,
    active: Arc<DashMap<String, CancellationToken>>,
    timeout: Option<Duration>,
}

impl RunExecutor {
    pub fn new(agent: Arc<dyn Agent>, storage: Storage, timeout: Option<Duration>) -> Self {
        Self {
            agent,
            storage,
            active: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Record a new run and register its cancellation token
    fn register(&self, prepared: &PreparedRun) -> Result<(Run, CancellationToken)> {
        let identity = &prepared.identity;
        let run = Run::new(
            identity.thread_id.clone(),
            identity.assistant_id.clone(),
            identity.user_id.clone(),
        );
        self.storage.create_run(&run)?;

        let token = CancellationToken::new();
        self.active.insert(run.id.clone(), token.clone());
        Ok((run, token))
    }

    /// Start a run detached from the request. Returns its id immediately.
    #[instrument(skip(self, prepared), fields(thread_id = %prepared.identity.thread_id))]
    pub fn spawn_background(&self, prepared: PreparedRun) -> Result<String> {
        let (run, token) = self.register(&prepared)?;
        let run_id = run.id.clone();
        let executor = self.clone();

        tracing::info!("Starting background run {}", run_id);

        tokio::spawn(async move {
            executor.mark(&run.id, RunStatus::Running, None);

            let input = prepared.input_value();
            let deadline = executor.deadline();
            let outcome = tokio::select! {
                _ = token.cancelled() => Outcome::Cancelled,
                _ = sleep_until(deadline) => Outcome::TimedOut,
                result = AssertUnwindSafe(executor.agent.invoke(input, &prepared.config)).catch_unwind() => match result {
                    Ok(Ok(_)) => Outcome::Completed,
                    Ok(Err(e)) => Outcome::Failed(e.to_string()),
                    Err(_) => Outcome::Failed(PANIC_MESSAGE.to_string()),
                },
            };

            executor.finish(&run.id, outcome);
        });

        Ok(run_id)
    }

    /// Start a streaming run. The receiver yields the metadata event, then
    /// snapshots in production order, then either `End` or one error.
    #[instrument(skip(self, prepared), fields(thread_id = %prepared.identity.thread_id))]
    pub fn stream(&self, prepared: PreparedRun) -> Result<(String, mpsc::Receiver<StreamEvent>)> {
        let (run, token) = self.register(&prepared)?;
        let run_id = run.id.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let executor = self.clone();

        tracing::info!("Starting streaming run {}", run_id);

        tokio::spawn(async move {
            if tx
                .send(StreamEvent::Metadata {
                    run_id: run.id.clone(),
                })
                .await
                .is_err()
            {
                executor.finish(&run.id, Outcome::Disconnected);
                return;
            }

            executor.mark(&run.id, RunStatus::Running, None);

            let input = prepared.input_value();
            let deadline = executor.deadline();
            let outcome = tokio::select! {
                _ = token.cancelled() => Outcome::Cancelled,
                _ = tx.closed() => Outcome::Disconnected,
                _ = sleep_until(deadline) => Outcome::TimedOut,
                result = AssertUnwindSafe(forward(executor.agent.as_ref(), input, &prepared.config, &tx)).catch_unwind() => {
                    result.unwrap_or_else(|_| Outcome::Failed(PANIC_MESSAGE.to_string()))
                }
            };

            let terminal = match &outcome {
                Outcome::Completed => Some(StreamEvent::End),
                Outcome::Failed(_) => Some(error_event(INTERNAL_ERROR_MESSAGE)),
                Outcome::TimedOut => Some(error_event(TIMEOUT_MESSAGE)),
                Outcome::Cancelled => Some(error_event(CANCELLED_MESSAGE)),
                Outcome::Disconnected => None,
            };
            if let Some(event) = terminal {
                let _ = tx.send(event).await;
            }

            executor.finish(&run.id, outcome);
        });

        Ok((run_id, rx))
    }

    /// Signal an in-flight run to stop. Returns false if the run is not active.
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.active.get(run_id) {
            Some(token) => {
                token.cancel();
                tracing::info!("Cancellation requested for run {}", run_id);
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight run
    pub fn cancel_all(&self) {
        for entry in self.active.iter() {
            entry.value().cancel();
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    fn mark(&self, run_id: &str, status: RunStatus, error: Option<&str>) {
        if let Err(e) = self.storage.update_run_status(run_id, status, error) {
            tracing::error!("Failed to update run {} to {}: {}", run_id, status.as_str(), e);
        }
    }

    fn finish(&self, run_id: &str, outcome: Outcome) {
        self.active.remove(run_id);

        match outcome {
            Outcome::Completed => {
                tracing::info!("Run {} completed", run_id);
                self.mark(run_id, RunStatus::Completed, None);
            }
            Outcome::Failed(error) => {
                tracing::error!("Run {} failed: {}", run_id, error);
                self.mark(run_id, RunStatus::Failed, Some(&error));
            }
            Outcome::TimedOut => {
                tracing::warn!("Run {} timed out", run_id);
                self.mark(run_id, RunStatus::Failed, Some(TIMEOUT_MESSAGE));
            }
            Outcome::Cancelled => {
                tracing::info!("Run {} cancelled", run_id);
                self.mark(run_id, RunStatus::Cancelled, None);
            }
            Outcome::Disconnected => {
                tracing::info!("Client disconnected from run {}", run_id);
                self.mark(run_id, RunStatus::Cancelled, Some("Client disconnected"));
            }
        }
    }
}

/// Pull snapshots from the agent into the channel until the stream ends
async fn forward(
    agent: &dyn Agent,
    input: Value,
    config: &RunConfig,
    tx: &mpsc::Sender<StreamEvent>,
) -> Outcome {
    let mut snapshots = match agent.stream(input, config).await {
        Ok(stream) => stream,
        Err(e) => return Outcome::Failed(e.to_string()),
    };

    while let Some(item) = snapshots.next().await {
        match item {
            Ok(snapshot) => {
                if tx.send(StreamEvent::Snapshot(snapshot)).await.is_err() {
                    return Outcome::Disconnected;
                }
            }
            Err(e) => return Outcome::Failed(e.to_string()),
        }
    }

    Outcome::Completed
}

fn error_event(message: &str) -> StreamEvent {
    StreamEvent::Error {
        message: message.to_string(),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
