use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which workflow a job belongs to.
///
/// Informational only: the store and the orchestration core never branch on
/// it, but it flows into logs and status views so pollers know what they are
/// looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Document upload and ingestion into the index.
    Ingestion,
    /// Full multi-agent analysis of a case file.
    Analysis,
    /// Analysis of an opposing petition.
    PetitionAnalysis,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Ingestion => write!(f, "ingestion"),
            JobKind::Analysis => write!(f, "analysis"),
            JobKind::PetitionAnalysis => write!(f, "petition-analysis"),
        }
    }
}

/// Lifecycle status of a job: `Created → Running → Succeeded | Failed`.
///
/// Transitions are monotonic; nothing ever leaves a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "CREATED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Classifies why a job reached `Failed`.
///
/// Pollers use the class to decide between "retry later" (`Timeout`) and
/// "do not retry" (everything caught by validation before the job existed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The context-retrieval stage failed entirely.
    ContextUnavailable,
    /// Every worker in the fan-out stage failed or timed out.
    AllWorkersFailed,
    /// A sequential stage that depends on fan-out outputs failed.
    DependentStageFailed,
    /// An individual worker exceeded its deadline.
    Timeout,
    /// The job was cancelled on request.
    Cancelled,
    /// An unexpected error caught at the orchestrator boundary.
    Internal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::ContextUnavailable => write!(f, "context unavailable"),
            FailureClass::AllWorkersFailed => write!(f, "all workers failed"),
            FailureClass::DependentStageFailed => write!(f, "dependent stage failed"),
            FailureClass::Timeout => write!(f, "timeout"),
            FailureClass::Cancelled => write!(f, "cancelled"),
            FailureClass::Internal => write!(f, "internal error"),
        }
    }
}

/// Terminal failure stored on a `Failed` job: a classification plus a
/// human-readable message, surfaced verbatim to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub class: FailureClass,
    pub message: String,
}

impl JobFailure {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// One tracked unit of asynchronous work.
///
/// Invariant: exactly one of `result`/`error` is set once `status` is
/// terminal; neither is set before that. `progress_percent` never decreases
/// while the job runs and is forced to 100 on success. Both invariants are
/// enforced by [`JobStore`](super::JobStore), the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Free-text description of the current sub-step, e.g.
    /// "executando agentes especialistas".
    pub stage_label: String,
    pub progress_percent: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl JobRecord {
    pub(crate) fn new(id: impl Into<String>, kind: JobKind, initial_stage: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            status: JobStatus::Created,
            stage_label: initial_stage.to_string(),
            progress_percent: 0,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
