//! Registry of in-flight jobs, backing the explicit cancel endpoint.
//!
//! Cancellation is cooperative and explicit: cancelling trips the job's
//! token, which the poll loop observes. Transport disconnection never goes
//! through here.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use airwave_core::error::CoreError;

struct RegisteredJob {
    user_id: String,
    token: CancellationToken,
}

/// Live jobs by id. Entries are removed when the controller task finishes.
#[derive(Default)]
pub struct JobRegistry {
    inner: Mutex<HashMap<Uuid, RegisteredJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: Uuid, user_id: String, token: CancellationToken) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.insert(job_id, RegisteredJob { user_id, token });
    }

    pub fn remove(&self, job_id: Uuid) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.remove(&job_id);
    }

    /// Trip the cancellation token of a job owned by `user_id`.
    ///
    /// Unknown (or already finished) jobs are `NotFound`; another user's
    /// job is `Forbidden`.
    pub fn cancel(&self, user_id: &str, job_id: Uuid) -> Result<(), CoreError> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        match inner.get(&job_id) {
            None => Err(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            }),
            Some(job) if job.user_id != user_id => Err(CoreError::Forbidden(
                "Cannot cancel another user's job".to_string(),
            )),
            Some(job) => {
                job.token.cancel();
                Ok(())
            }
        }
    }
}
