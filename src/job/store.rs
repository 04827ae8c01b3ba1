use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use super::record::{FailureClass, JobFailure, JobKind, JobRecord, JobStatus};

/// Errors returned by [`JobStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("job id already registered: {0}")]
    DuplicateId(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid transition for job {id}: {from} cannot become {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

/// In-memory registry of [`JobRecord`]s keyed by id.
///
/// All mutation goes through these operations, each of which holds a single
/// coarse map-level lock for the duration of the in-memory update. Nothing
/// here awaits, so the std mutex is never held across a suspension point.
///
/// The store enforces the two record invariants: progress never regresses
/// while a job runs, and a terminal status is final — late writes from a
/// cancelled or superseded orchestrator are rejected here and dropped by
/// the caller.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JobRecord>> {
        // Every critical section is a plain field update; a panic mid-update
        // cannot leave a record half-written, so a poisoned lock is safe to
        // re-enter.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_record<R>(
        &self,
        id: &str,
        apply: impl FnOnce(&mut JobRecord) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut jobs = self.lock();
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(record)
    }

    /// Register a new job. Fails with [`StoreError::DuplicateId`] if the id
    /// is already present.
    pub fn create(
        &self,
        id: &str,
        kind: JobKind,
        initial_stage: &str,
    ) -> Result<JobRecord, StoreError> {
        let mut jobs = self.lock();
        if jobs.contains_key(id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        let record = JobRecord::new(id, kind, initial_stage);
        jobs.insert(id.to_string(), record.clone());
        debug!(job_id = id, kind = %kind, "job registered");
        Ok(record)
    }

    /// Move a freshly created job into `Running`.
    pub fn transition_to_running(&self, id: &str, stage_label: &str) -> Result<(), StoreError> {
        self.with_record(id, |record| match record.status {
            JobStatus::Created => {
                record.status = JobStatus::Running;
                record.stage_label = stage_label.to_string();
                record.touch();
                Ok(())
            }
            from => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from,
                to: JobStatus::Running,
            }),
        })
    }

    /// Update the stage label and progress of a running job.
    ///
    /// Monotonicity guard: a percentage lower than the stored value is
    /// rejected with a warning, not an error, and the stored value stays.
    /// Calls against a job that is not `Running` are ignored the same way;
    /// only an unknown id is an error.
    pub fn update_progress(
        &self,
        id: &str,
        stage_label: &str,
        progress_percent: u8,
    ) -> Result<(), StoreError> {
        self.with_record(id, |record| {
            if record.status != JobStatus::Running {
                warn!(
                    job_id = id,
                    status = %record.status,
                    "progress update ignored: job is not running"
                );
                return Ok(());
            }
            let requested = progress_percent.min(100);
            if requested < record.progress_percent {
                warn!(
                    job_id = id,
                    stored = record.progress_percent,
                    requested,
                    "progress regression rejected"
                );
            } else {
                record.progress_percent = requested;
            }
            record.stage_label = stage_label.to_string();
            record.touch();
            Ok(())
        })
    }

    /// Finish a running job successfully, storing its result payload.
    pub fn complete_success(
        &self,
        id: &str,
        result: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.with_record(id, |record| match record.status {
            JobStatus::Running => {
                record.status = JobStatus::Succeeded;
                record.progress_percent = 100;
                record.result = Some(result);
                record.touch();
                Ok(())
            }
            from => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from,
                to: JobStatus::Succeeded,
            }),
        })
    }

    /// Finish a running job with a classified failure.
    pub fn complete_failure(&self, id: &str, failure: JobFailure) -> Result<(), StoreError> {
        self.with_record(id, |record| match record.status {
            JobStatus::Running => {
                record.status = JobStatus::Failed;
                record.error = Some(failure);
                record.touch();
                Ok(())
            }
            from => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from,
                to: JobStatus::Failed,
            }),
        })
    }

    /// Cancel a job that has not reached a terminal status.
    ///
    /// Works from `Created` as well as `Running`: a queued job can be
    /// cancelled before its orchestrator ever starts. In-flight workers are
    /// not interrupted; their late terminal write bounces off the guard.
    pub fn cancel(&self, id: &str, message: &str) -> Result<(), StoreError> {
        self.with_record(id, |record| match record.status {
            JobStatus::Created | JobStatus::Running => {
                record.status = JobStatus::Failed;
                record.error = Some(JobFailure::new(FailureClass::Cancelled, message));
                record.touch();
                Ok(())
            }
            from => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from,
                to: JobStatus::Failed,
            }),
        })
    }

    /// Read a snapshot of a job. The returned record is a clone; mutating it
    /// has no effect on the store.
    pub fn get(&self, id: &str) -> Result<JobRecord, StoreError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Evict a record. Idempotent; returns whether anything was removed.
    /// The core never calls this on its own — retention is the embedder's
    /// policy.
    pub fn delete(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
