//! The request/poll/result contract consumed by external handlers.
//!
//! [`JobService`] is the only entry point request handlers need: it
//! registers a job, detaches its orchestrator onto a background task, and
//! answers status/result polls from the store. Construction is explicit —
//! the store and the agent panel are injected, never global.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::job::{JobFailure, JobKind, JobRecord, JobStatus, JobStore, StoreError};
use crate::orchestrator::{AgentPanel, JobOrchestrator, JobRequest, WorkflowProfile};

/// Poll answer for one job. Serializable as-is by an HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub stage_label: String,
    pub progress_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl From<JobRecord> for StatusView {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            status: record.status,
            stage_label: record.stage_label,
            progress_percent: record.progress_percent,
            error: record.error,
        }
    }
}

/// Errors answering a result poll. `NotReady` is the "too early" signal,
/// deliberately distinct from an unknown id and from a stored failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job is not finished yet (status {status}, {progress_percent}%)")]
    NotReady {
        status: JobStatus,
        progress_percent: u8,
    },

    #[error("job failed: {0}")]
    Failed(JobFailure),
}

/// Front door of the orchestration core.
///
/// `create_job` must be called from within a tokio runtime: the returned id
/// is usable immediately while the work itself runs on a detached task.
pub struct JobService<P> {
    store: Arc<JobStore>,
    panel: Arc<P>,
    worker_timeout: Option<Duration>,
}

impl<P: AgentPanel> JobService<P> {
    pub fn new(store: Arc<JobStore>, panel: Arc<P>) -> Self {
        Self {
            store,
            panel,
            worker_timeout: None,
        }
    }

    /// Override the per-worker deadline for every job this service creates.
    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Register a job and start its orchestrator in the background.
    /// Returns as soon as the record exists; callers poll from here on.
    pub fn create_job(&self, kind: JobKind, request: JobRequest) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.store.create(&id, kind, "aguardando inicio")?;

        let mut profile = WorkflowProfile::for_kind(kind);
        if let Some(timeout) = self.worker_timeout {
            profile = profile.with_worker_timeout(timeout);
        }
        let orchestrator = Arc::new(JobOrchestrator::with_profile(
            Arc::clone(&self.store),
            Arc::clone(&self.panel),
            profile,
        ));
        tokio::spawn(orchestrator.run(id.clone(), request));

        debug!(job_id = %id, %kind, "job accepted");
        Ok(id)
    }

    /// Idempotent, side-effect-free status poll.
    pub fn get_status(&self, job_id: &str) -> Result<StatusView, StoreError> {
        self.store.get(job_id).map(StatusView::from)
    }

    /// Fetch the result of a finished job.
    pub fn get_result(&self, job_id: &str) -> Result<Value, ResultError> {
        let record = self
            .store
            .get(job_id)
            .map_err(|_| ResultError::NotFound(job_id.to_string()))?;
        match record.status {
            JobStatus::Succeeded => Ok(record.result.unwrap_or(Value::Null)),
            JobStatus::Failed => Err(ResultError::Failed(record.error.unwrap_or_else(|| {
                JobFailure::new(crate::job::FailureClass::Internal, "failure record missing")
            }))),
            JobStatus::Created | JobStatus::Running => Err(ResultError::NotReady {
                status: record.status,
                progress_percent: record.progress_percent,
            }),
        }
    }

    /// Cancel a queued or running job. Its in-flight workers finish on
    /// their own and their results are discarded.
    pub fn cancel(&self, job_id: &str) -> Result<(), StoreError> {
        self.store.cancel(job_id, "cancelado a pedido do cliente")
    }

    /// Evict a record from memory. Idempotent.
    pub fn evict(&self, job_id: &str) -> bool {
        self.store.delete(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StageResult;
    use crate::job::FailureClass;
    use crate::orchestrator::CaseContext;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::sync::Notify;
    use tokio::time::sleep;

    /// Panel that answers instantly, optionally holding workers at a gate
    /// until the test releases them.
    #[derive(Default)]
    struct InstantPanel {
        gate: Option<Arc<Notify>>,
    }

    impl AgentPanel for InstantPanel {
        async fn retrieve_context(&self, request: &JobRequest) -> anyhow::Result<CaseContext> {
            Ok(CaseContext {
                excerpts: vec![request.document.clone()],
                scope: request.scope.clone(),
            })
        }

        async fn run_worker(
            &self,
            worker_id: &str,
            _context: &CaseContext,
            _request: &JobRequest,
        ) -> anyhow::Result<Value> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(json!({"agent": worker_id}))
        }

        fn compile(
            &self,
            _context: &CaseContext,
            fanout: &StageResult<Value>,
            sequential: &[(String, Value)],
        ) -> anyhow::Result<Value> {
            Ok(json!({
                "sections": serde_json::to_value(&fanout.succeeded)?,
                "sequential": sequential.len(),
            }))
        }
    }

    fn service(panel: InstantPanel) -> JobService<InstantPanel> {
        JobService::new(Arc::new(JobStore::new()), Arc::new(panel))
    }

    fn request() -> JobRequest {
        JobRequest {
            document: "Processo 0001234-56.2024.5.02.0001".into(),
            scope: None,
            workers: vec!["civel".into(), "medico".into()],
        }
    }

    async fn poll_until_terminal(svc: &JobService<InstantPanel>, id: &str) -> StatusView {
        for _ in 0..500 {
            let status = svc.get_status(id).unwrap();
            if status.status.is_terminal() {
                return status;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached a terminal status");
    }

    #[tokio::test]
    async fn create_poll_result_lifecycle() {
        let svc = service(InstantPanel::default());
        let id = svc.create_job(JobKind::Analysis, request()).unwrap();

        let status = poll_until_terminal(&svc, &id).await;
        assert_eq!(status.status, JobStatus::Succeeded);
        assert_eq!(status.progress_percent, 100);
        assert!(status.error.is_none());

        let result = svc.get_result(&id).unwrap();
        assert_eq!(result["sections"].as_array().unwrap().len(), 2);
        assert_eq!(result["sequential"], 2);
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_not_found() {
        let svc = service(InstantPanel::default());
        assert!(matches!(
            svc.get_status("missing"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(
            svc.get_result("missing"),
            Err(ResultError::NotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn result_before_completion_is_too_early() {
        let gate = Arc::new(Notify::new());
        let svc = service(InstantPanel {
            gate: Some(Arc::clone(&gate)),
        });
        let id = svc
            .create_job(
                JobKind::Ingestion,
                JobRequest {
                    document: "doc".into(),
                    scope: None,
                    workers: vec!["extrator".into()],
                },
            )
            .unwrap();

        // The job is parked at the gate: polls see a live, unfinished job.
        let err = svc.get_result(&id).unwrap_err();
        assert!(matches!(err, ResultError::NotReady { .. }));
        assert_ne!(err, ResultError::NotFound(id.clone()));

        gate.notify_one();
        let status = poll_until_terminal(&svc, &id).await;
        assert_eq!(status.status, JobStatus::Succeeded);
        assert!(svc.get_result(&id).is_ok());
    }

    #[tokio::test]
    async fn failed_job_surfaces_stored_failure() {
        // The instant panel never fails, so write the terminal failure the
        // way an orchestrator would.
        let svc = service(InstantPanel::default());
        let store = Arc::clone(svc.store());
        store.create("j", JobKind::Analysis, "queued").unwrap();
        store.transition_to_running("j", "go").unwrap();
        store
            .complete_failure(
                "j",
                JobFailure::new(FailureClass::AllWorkersFailed, "nobody answered"),
            )
            .unwrap();

        match svc.get_result("j") {
            Err(ResultError::Failed(failure)) => {
                assert_eq!(failure.class, FailureClass::AllWorkersFailed);
                assert_eq!(failure.message, "nobody answered");
            }
            other => panic!("expected stored failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_job_discards_late_results() {
        let gate = Arc::new(Notify::new());
        let svc = service(InstantPanel {
            gate: Some(Arc::clone(&gate)),
        });
        let id = svc
            .create_job(
                JobKind::Ingestion,
                JobRequest {
                    document: "doc".into(),
                    scope: None,
                    workers: vec!["extrator".into()],
                },
            )
            .unwrap();

        // Wait until the orchestrator has taken the job to Running.
        for _ in 0..500 {
            if svc.get_status(&id).unwrap().status == JobStatus::Running {
                break;
            }
            sleep(Duration::from_millis(2)).await;
        }

        svc.cancel(&id).unwrap();
        let status = svc.get_status(&id).unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.error.as_ref().unwrap().class, FailureClass::Cancelled);

        // Release the worker; its late success must not overwrite the
        // cancellation.
        gate.notify_one();
        sleep(Duration::from_millis(50)).await;
        let status = svc.get_status(&id).unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.error.unwrap().class, FailureClass::Cancelled);
        assert!(matches!(svc.get_result(&id), Err(ResultError::Failed(_))));
    }

    #[tokio::test]
    async fn concurrent_creates_never_collide() {
        let svc = Arc::new(service(InstantPanel::default()));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                (0..8)
                    .map(|_| svc.create_job(JobKind::Analysis, request()).unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(ids.insert(id), "duplicate job id");
            }
        }
        assert_eq!(ids.len(), 128);
    }

    #[tokio::test]
    async fn evict_removes_record() {
        let svc = service(InstantPanel::default());
        let id = svc.create_job(JobKind::Analysis, request()).unwrap();
        poll_until_terminal(&svc, &id).await;

        assert!(svc.evict(&id));
        assert!(!svc.evict(&id));
        assert!(matches!(svc.get_status(&id), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn status_view_serializes_for_handlers() {
        let svc = service(InstantPanel::default());
        let id = svc.create_job(JobKind::PetitionAnalysis, request()).unwrap();
        let status = poll_until_terminal(&svc, &id).await;

        let encoded = serde_json::to_value(&status).unwrap();
        assert_eq!(encoded["kind"], "petition_analysis");
        assert_eq!(encoded["status"], "succeeded");
        assert_eq!(encoded["progress_percent"], 100);
        assert!(encoded.get("error").is_none());
    }
}
