mod record;
mod store;

pub use record::{FailureClass, JobFailure, JobKind, JobRecord, JobStatus};
pub use store::{JobStore, StoreError};
