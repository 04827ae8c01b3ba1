//! Fan-out/fan-in execution of independent workers.
//!
//! [`ExecutionEngine::run`] takes a set of named worker futures, runs each on
//! its own task with an optional deadline, and folds every outcome — success,
//! error, timeout, panic — into a [`StageResult`]. Nothing a worker does can
//! abort a sibling, and the engine always waits for the whole set before
//! returning.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

type WorkerCall<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// One named unit of fan-out work: an agent id and the future that runs it.
pub struct Worker<T> {
    id: String,
    call: WorkerCall<T>,
}

impl<T> Worker<T> {
    pub fn new(
        id: impl Into<String>,
        call: impl Future<Output = anyhow::Result<T>> + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            call: Box::pin(call),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Debug for Worker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker").field("id", &self.id).finish()
    }
}

/// Why a worker's outcome landed in the `failed` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerFailure {
    /// The worker's deadline elapsed. The underlying call keeps running on
    /// its abandoned task; only the result is discarded.
    TimedOut { after_ms: u64 },
    /// The worker returned an error.
    Errored { message: String },
    /// The worker's task panicked.
    Panicked { message: String },
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerFailure::TimedOut { after_ms } => write!(f, "timed out after {after_ms}ms"),
            WorkerFailure::Errored { message } => write!(f, "errored: {message}"),
            WorkerFailure::Panicked { message } => write!(f, "panicked: {message}"),
        }
    }
}

impl WorkerFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkerFailure::TimedOut { .. })
    }
}

/// A successful worker outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem<T> {
    pub worker_id: String,
    pub output: T,
}

/// A failed worker outcome, captured as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedWork {
    pub worker_id: String,
    pub reason: WorkerFailure,
}

/// Fan-in aggregation for one stage.
///
/// Both lists are sorted by `worker_id`, so the result is deterministic
/// regardless of completion order. Together they cover exactly the requested
/// worker set: every worker lands in one list, none in both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult<T> {
    pub succeeded: Vec<WorkItem<T>>,
    pub failed: Vec<FailedWork>,
}

impl<T> StageResult<T> {
    pub fn empty() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when at least one worker ran and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// Joined `worker: reason` summary of the failed list, for terminal
    /// failure messages.
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|f| format!("{}: {}", f.worker_id, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<T> Default for StageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Runs worker sets concurrently and folds their outcomes.
pub struct ExecutionEngine;

impl ExecutionEngine {
    /// Run every worker concurrently, each with the optional per-worker
    /// deadline, and block until all of them have finished or timed out.
    ///
    /// Failures are isolated: one worker erroring, timing out, or panicking
    /// is recorded and the rest run to completion. There is no
    /// short-circuit mode. Worker sets here are small (a handful of
    /// agents); a concurrency cap would slot in around the spawn below if
    /// an integrator ever fans out wider.
    pub async fn run<T: Send + 'static>(
        workers: Vec<Worker<T>>,
        deadline: Option<Duration>,
    ) -> StageResult<T> {
        let mut handles = Vec::with_capacity(workers.len());
        for Worker { id, call } in workers {
            let handle = tokio::spawn(async move {
                match deadline {
                    Some(limit) => match tokio::time::timeout(limit, call).await {
                        Ok(outcome) => outcome.map_err(|err| WorkerFailure::Errored {
                            message: format!("{err:#}"),
                        }),
                        Err(_) => Err(WorkerFailure::TimedOut {
                            after_ms: limit.as_millis() as u64,
                        }),
                    },
                    None => call.await.map_err(|err| WorkerFailure::Errored {
                        message: format!("{err:#}"),
                    }),
                }
            });
            handles.push((id, handle));
        }

        let mut result = StageResult::empty();
        for (worker_id, handle) in handles {
            match handle.await {
                Ok(Ok(output)) => {
                    debug!(worker = %worker_id, "worker succeeded");
                    result.succeeded.push(WorkItem { worker_id, output });
                }
                Ok(Err(reason)) => {
                    warn!(worker = %worker_id, %reason, "worker failed");
                    result.failed.push(FailedWork { worker_id, reason });
                }
                Err(join_err) => {
                    let reason = WorkerFailure::Panicked {
                        message: join_err.to_string(),
                    };
                    warn!(worker = %worker_id, %reason, "worker task died");
                    result.failed.push(FailedWork { worker_id, reason });
                }
            }
        }

        result.succeeded.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        result.failed.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        result
    }
}
