//! Remote service seam: wire types and the traits the apply pass talks through.
//!
//! [`HttpClient`](crate::HttpClient) is the production implementation; tests
//! substitute in-memory fakes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stencil_core::{TemplateName, Variable, VersionId};

use crate::error::RemoteError;

/// Remote identity of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Lifecycle state of a provisioner job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Canceling,
    Canceled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// The job has not reached a terminal state yet.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Running | JobStatus::Canceling
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Canceling => "canceling",
            JobStatus::Canceled => "canceled",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One line of build output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerLog {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub log_level: String,
    #[serde(default)]
    pub stage: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: VersionId,
    pub name: String,
    pub job: ProvisionerJob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: TemplateName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_version_id: Option<VersionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateVersionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub file_id: String,
    pub storage_method: &'static str,
    pub provisioner: &'static str,
    pub user_variable_values: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTemplateRequest {
    pub name: TemplateName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template_version_id: VersionId,
}

/// Log entries in arrival order. The iterator ends when the remote closes the
/// stream; dropping it closes the underlying connection.
pub type LogStream<'a> = Box<dyn Iterator<Item = Result<ProvisionerLog, RemoteError>> + 'a>;

/// The two calls [`JobWaiter`](crate::JobWaiter) needs.
pub trait JobApi {
    /// Current state of the build job behind `version`.
    fn version_job(&self, version: &VersionId) -> Result<ProvisionerJob, RemoteError>;

    /// Subscribe to the job's logs, starting after log id `after`.
    fn stream_logs(&self, version: &VersionId, after: i64) -> Result<LogStream<'_>, RemoteError>;
}

/// Everything an apply pass asks of the remote service.
pub trait TemplateApi: JobApi {
    fn template_by_name(&self, name: &TemplateName) -> Result<Option<Template>, RemoteError>;

    fn create_template(&self, request: &CreateTemplateRequest) -> Result<Template, RemoteError>;

    /// Upload a tar bundle; returns the file id to reference in a version.
    fn upload_bundle(&self, bundle: Vec<u8>) -> Result<String, RemoteError>;

    fn create_version(&self, request: &CreateVersionRequest)
        -> Result<TemplateVersion, RemoteError>;

    /// `Ok(None)` when the version no longer exists.
    fn version(&self, id: &VersionId) -> Result<Option<TemplateVersion>, RemoteError>;

    fn rename_version(&self, id: &VersionId, name: &str) -> Result<TemplateVersion, RemoteError>;

    fn activate_version(&self, template: &TemplateId, id: &VersionId) -> Result<(), RemoteError>;
}
