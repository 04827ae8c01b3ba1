//! Workflow orchestration: context retrieval, agent fan-out, dependent
//! sequential stages, and compilation of the final payload.
//!
//! One [`JobOrchestrator`] instance drives exactly one job to a terminal
//! state. All agent behavior sits behind the [`AgentPanel`] seam so the
//! pipeline can run against the real LLM-backed panel or a test double.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::engine::{ExecutionEngine, StageResult, Worker};
use crate::job::{FailureClass, JobFailure, JobKind, JobStore};
use crate::progress::{ProgressPlan, ProgressReporter};

/// Caller-supplied input for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Raw document or case text under analysis.
    pub document: String,
    /// Optional retrieval scope, passed through to the context stage
    /// untouched (e.g. an index collection name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Fan-out worker ids selected by the caller. May be empty, in which
    /// case the fan-out stage is skipped entirely.
    #[serde(default)]
    pub workers: Vec<String>,
}

/// Context retrieved once per job and shared by every agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseContext {
    pub excerpts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl CaseContext {
    pub fn joined(&self) -> String {
        self.excerpts.join("\n\n")
    }
}

/// The collaborator seam the orchestrator drives.
///
/// `run_worker` is invoked uniformly for fan-out specialists and for the
/// sequential dependent agents. Futures must be `Send` because fan-out
/// workers cross onto their own tasks.
pub trait AgentPanel: Send + Sync + 'static {
    /// Retrieve the context every downstream agent receives.
    fn retrieve_context(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = anyhow::Result<CaseContext>> + Send;

    /// Run a single agent against the retrieved context.
    fn run_worker(
        &self,
        worker_id: &str,
        context: &CaseContext,
        request: &JobRequest,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;

    /// Assemble the final payload. Fan-out lists and sequential outputs
    /// arrive in worker-id / declaration order, so a pure implementation is
    /// deterministic by construction.
    fn compile(
        &self,
        context: &CaseContext,
        fanout: &StageResult<Value>,
        sequential: &[(String, Value)],
    ) -> anyhow::Result<Value>;
}

/// Per-kind workflow shape: which dependent agents run after the fan-out,
/// how stage weights map to progress, and the per-worker deadline.
#[derive(Debug, Clone)]
pub struct WorkflowProfile {
    /// Sequential dependent worker ids, run in order after the fan-out.
    pub sequential: Vec<String>,
    /// Deadline applied to each worker call, fan-out and sequential alike.
    pub worker_timeout: Duration,
}

impl WorkflowProfile {
    pub fn for_kind(kind: JobKind) -> Self {
        let sequential = match kind {
            JobKind::Analysis => vec!["estrategista".to_string(), "prognostico".to_string()],
            JobKind::PetitionAnalysis => vec!["estrategista".to_string()],
            JobKind::Ingestion => Vec::new(),
        };
        Self {
            sequential,
            worker_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Stage weights: fixed context and compile slices, the rest split
    /// between the fan-out and the sequential agents.
    fn progress_plan(&self) -> ProgressPlan {
        let mut stages: Vec<(String, u8)> = vec![("contexto".to_string(), 10)];
        if self.sequential.is_empty() {
            stages.push(("especialistas".to_string(), 80));
        } else {
            stages.push(("especialistas".to_string(), 50));
            let count = self.sequential.len() as u8;
            let share = 30 / count;
            for (index, worker_id) in self.sequential.iter().enumerate() {
                let weight = if index as u8 == count - 1 {
                    30 - share * (count - 1)
                } else {
                    share
                };
                stages.push((worker_id.clone(), weight));
            }
        }
        stages.push(("compilacao".to_string(), 10));
        ProgressPlan::new(stages)
    }
}

/// Drives one job through the full pipeline and guarantees a terminal
/// status whatever happens inside it.
pub struct JobOrchestrator<P> {
    store: Arc<JobStore>,
    panel: Arc<P>,
    profile: WorkflowProfile,
}

impl<P: AgentPanel> JobOrchestrator<P> {
    pub fn new(store: Arc<JobStore>, panel: Arc<P>, kind: JobKind) -> Self {
        Self::with_profile(store, panel, WorkflowProfile::for_kind(kind))
    }

    pub fn with_profile(store: Arc<JobStore>, panel: Arc<P>, profile: WorkflowProfile) -> Self {
        Self {
            store,
            panel,
            profile,
        }
    }

    /// Run the job to completion. Infallible by contract: every outcome —
    /// success, classified failure, even a panic inside the pipeline —
    /// lands as a terminal status in the store.
    pub async fn run(self: Arc<Self>, job_id: String, request: JobRequest) {
        let pipeline = {
            let orchestrator = Arc::clone(&self);
            let job_id = job_id.clone();
            // A child task so that a panic anywhere in the pipeline comes
            // back as a JoinError instead of killing this supervisor.
            tokio::spawn(async move { orchestrator.execute(&job_id, request).await })
        };

        let outcome = match pipeline.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(JobFailure::new(
                FailureClass::Internal,
                format!("pipeline task died: {join_err}"),
            )),
        };

        let written = match outcome {
            Ok(result) => self.store.complete_success(&job_id, result),
            Err(failure) => {
                error!(job_id = %job_id, class = %failure.class, message = %failure.message, "job failed");
                self.store.complete_failure(&job_id, failure)
            }
        };
        if let Err(err) = written {
            // Typically a job cancelled mid-run: the record is already
            // terminal and the late result is dropped here.
            debug!(job_id = %job_id, %err, "terminal write dropped");
        }
    }

    async fn execute(&self, job_id: &str, request: JobRequest) -> Result<Value, JobFailure> {
        self.store
            .transition_to_running(job_id, "recuperando contexto")
            .map_err(|err| JobFailure::new(FailureClass::Internal, err.to_string()))?;

        let reporter = ProgressReporter::new(
            Arc::clone(&self.store),
            job_id,
            self.profile.progress_plan(),
        );

        reporter.begin_stage("contexto", "recuperando contexto");
        let context = self
            .panel
            .retrieve_context(&request)
            .await
            .map_err(|err| {
                JobFailure::new(FailureClass::ContextUnavailable, format!("{err:#}"))
            })?;
        reporter.finish_stage("contexto", "contexto recuperado");

        let mut selected = request.workers.clone();
        selected.sort();
        selected.dedup();

        let context = Arc::new(context);
        let request = Arc::new(request);

        let fanout = if selected.is_empty() {
            debug!(job_id, "no fan-out workers selected, skipping stage");
            StageResult::empty()
        } else {
            reporter.begin_stage("especialistas", "executando agentes especialistas");
            let workers = selected
                .iter()
                .map(|worker_id| {
                    let panel = Arc::clone(&self.panel);
                    let context = Arc::clone(&context);
                    let request = Arc::clone(&request);
                    let id = worker_id.clone();
                    Worker::new(worker_id.clone(), async move {
                        panel.run_worker(&id, &context, &request).await
                    })
                })
                .collect();
            let result = ExecutionEngine::run(workers, Some(self.profile.worker_timeout)).await;
            if result.all_failed() {
                return Err(JobFailure::new(
                    FailureClass::AllWorkersFailed,
                    result.failure_summary(),
                ));
            }
            result
        };
        reporter.finish_stage("especialistas", "agentes especialistas concluidos");

        let mut sequential: Vec<(String, Value)> =
            Vec::with_capacity(self.profile.sequential.len());
        for worker_id in &self.profile.sequential {
            reporter.begin_stage(worker_id, &format!("executando agente {worker_id}"));
            let call = self.panel.run_worker(worker_id, &context, &request);
            let output = match tokio::time::timeout(self.profile.worker_timeout, call).await {
                Ok(Ok(output)) => output,
                Ok(Err(err)) => {
                    return Err(JobFailure::new(
                        FailureClass::DependentStageFailed,
                        format!("{worker_id}: {err:#}"),
                    ));
                }
                Err(_) => {
                    return Err(JobFailure::new(
                        FailureClass::DependentStageFailed,
                        format!(
                            "{worker_id}: timed out after {}ms",
                            self.profile.worker_timeout.as_millis()
                        ),
                    ));
                }
            };
            sequential.push((worker_id.clone(), output));
            reporter.finish_stage(worker_id, &format!("agente {worker_id} concluido"));
        }

        reporter.begin_stage("compilacao", "compilando parecer");
        self.panel
            .compile(&context, &fanout, &sequential)
            .map_err(|err| {
                JobFailure::new(FailureClass::Internal, format!("compilation failed: {err:#}"))
            })
    }
}
