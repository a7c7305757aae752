//! Drive one remote build job to a terminal state.
//!
//! Each attempt is: subscribe to the log stream from offset zero, drain it
//! until the remote closes it, drop the stream, then poll the job once.
//!
//! | job status after close | outcome                               |
//! |------------------------|---------------------------------------|
//! | succeeded              | `Ok(logs)` from this attempt          |
//! | pending/running/…      | transient disconnect, next attempt    |
//! | failed/canceled/other  | [`JobError::Failed`], no retry        |
//!
//! After [`MAX_JOB_ATTEMPTS`] disconnects the wait fails with
//! [`JobError::RetriesExhausted`]. There is no overall deadline: callers that
//! need one must enforce it around [`JobWaiter::wait`].

use stencil_core::VersionId;

use crate::api::{JobApi, JobStatus, ProvisionerLog};
use crate::error::JobError;

/// Total subscribe-and-poll attempts before giving up.
pub const MAX_JOB_ATTEMPTS: usize = 3;

enum Attempt {
    Done(Vec<ProvisionerLog>),
    Disconnected,
}

pub struct JobWaiter<'a, A: JobApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: JobApi + ?Sized> JobWaiter<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Wait for the job behind `version`; returns the logs of the attempt
    /// that observed success. Logs from earlier attempts are not included.
    pub fn wait(&self, version: &VersionId) -> Result<Vec<ProvisionerLog>, JobError> {
        for attempt in 1..=MAX_JOB_ATTEMPTS {
            match self.attempt(version)? {
                Attempt::Done(logs) => return Ok(logs),
                Attempt::Disconnected => {
                    tracing::warn!(
                        %version,
                        attempt,
                        max_attempts = MAX_JOB_ATTEMPTS,
                        "log stream closed while job still active; reconnecting"
                    );
                }
            }
        }
        Err(JobError::RetriesExhausted {
            version: version.clone(),
            attempts: MAX_JOB_ATTEMPTS,
        })
    }

    fn attempt(&self, version: &VersionId) -> Result<Attempt, JobError> {
        let mut logs = Vec::new();
        {
            let stream = self.api.stream_logs(version, 0)?;
            for entry in stream {
                match entry {
                    Ok(log) => {
                        tracing::debug!(%version, stage = %log.stage, "{}", log.output);
                        logs.push(log);
                    }
                    Err(err) => {
                        tracing::warn!(%version, error = %err, "log stream interrupted");
                        break;
                    }
                }
            }
        }

        let job = self.api.version_job(version)?;
        match job.status {
            JobStatus::Succeeded => Ok(Attempt::Done(logs)),
            status if status.is_active() => Ok(Attempt::Disconnected),
            status => Err(JobError::Failed {
                version: version.clone(),
                status,
                message: job.error.unwrap_or_else(|| "no error message".to_string()),
            }),
        }
    }
}
