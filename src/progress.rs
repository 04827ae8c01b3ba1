//! Stage-weight bookkeeping for job progress.
//!
//! An orchestrator declares its pipeline once as a [`ProgressPlan`] — an
//! ordered list of named stages with percentage weights — and a
//! [`ProgressReporter`] translates stage boundaries into cumulative
//! percentages written through the [`JobStore`]. The reporter itself is
//! deliberately dumb: out-of-order or repeated reports are clamped by the
//! store's monotonic guard, never here.

use std::sync::Arc;

use tracing::warn;

use crate::job::JobStore;

/// Ordered, weighted stages of one workflow. Weights are percentage points
/// and should sum to 100; the cumulative value is capped there regardless.
#[derive(Debug, Clone)]
pub struct ProgressPlan {
    stages: Vec<(String, u8)>,
}

impl ProgressPlan {
    pub fn new<S: Into<String>>(stages: impl IntoIterator<Item = (S, u8)>) -> Self {
        Self {
            stages: stages
                .into_iter()
                .map(|(name, weight)| (name.into(), weight))
                .collect(),
        }
    }

    /// Cumulative percentage of all stages before `stage`.
    pub fn percent_before(&self, stage: &str) -> Option<u8> {
        let mut total: u16 = 0;
        for (name, weight) in &self.stages {
            if name == stage {
                return Some(total.min(100) as u8);
            }
            total += u16::from(*weight);
        }
        None
    }

    /// Cumulative percentage through the end of `stage`.
    pub fn percent_through(&self, stage: &str) -> Option<u8> {
        let mut total: u16 = 0;
        for (name, weight) in &self.stages {
            total += u16::from(*weight);
            if name == stage {
                return Some(total.min(100) as u8);
            }
        }
        None
    }
}

/// Writes stage-boundary progress for one job through the store.
pub struct ProgressReporter {
    store: Arc<JobStore>,
    job_id: String,
    plan: ProgressPlan,
}

impl ProgressReporter {
    pub fn new(store: Arc<JobStore>, job_id: impl Into<String>, plan: ProgressPlan) -> Self {
        Self {
            store,
            job_id: job_id.into(),
            plan,
        }
    }

    /// Mark `stage` as started: the job shows the given label and the
    /// cumulative percentage of everything before it.
    pub fn begin_stage(&self, stage: &str, label: &str) {
        let percent = self.percent_or_warn(stage, self.plan.percent_before(stage));
        self.write(label, percent);
    }

    /// Mark `stage` as finished.
    pub fn finish_stage(&self, stage: &str, label: &str) {
        let percent = self.percent_or_warn(stage, self.plan.percent_through(stage));
        self.write(label, percent);
    }

    fn percent_or_warn(&self, stage: &str, percent: Option<u8>) -> u8 {
        percent.unwrap_or_else(|| {
            // Unknown stage: write 0 and let the store's guard keep the
            // last-known value.
            warn!(job_id = %self.job_id, stage, "stage not in progress plan");
            0
        })
    }

    fn write(&self, label: &str, percent: u8) {
        if let Err(err) = self.store.update_progress(&self.job_id, label, percent) {
            warn!(job_id = %self.job_id, %err, "progress write failed");
        }
    }
}
