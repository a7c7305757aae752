//! Error types for stencil-remote.

use std::path::PathBuf;

use thiserror::Error;

use stencil_core::{ConfigError, VersionId};
use stencil_plan::PlanError;

use crate::api::JobStatus;

/// Failures talking to the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{method} {url} returned {status}: {message}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        message: String,
    },

    #[error("{method} {url} failed: {reason}")]
    Transport {
        method: &'static str,
        url: String,
        reason: String,
    },

    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed log entry from {url}: {source}")]
    Log {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }
}

/// Terminal failures of a remote build job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job reached a failed state. Never retried.
    #[error("build job for version {version} {status}: {message}")]
    Failed {
        version: VersionId,
        status: JobStatus,
        message: String,
    },

    /// The log stream kept closing while the job was still running.
    #[error("build job for version {version} did not complete after {attempts} retries")]
    RetriesExhausted { version: VersionId, attempts: usize },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// All errors that can arise from an apply pass.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Job(#[from] JobError),

    /// Building the upload bundle failed.
    #[error("failed to bundle {path}: {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reused version was planned without an identity.
    #[error("versions[{index}] was planned for reuse but has no identity")]
    MissingIdentity { index: usize },

    /// Versions were reused but the template does not exist remotely.
    #[error("template '{template}' does not exist on the remote service")]
    TemplateMissing { template: String },
}

pub(crate) fn bundle_err(path: impl Into<PathBuf>, source: std::io::Error) -> ApplyError {
    ApplyError::Bundle {
        path: path.into(),
        source,
    }
}
