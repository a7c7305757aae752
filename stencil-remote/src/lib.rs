//! Remote side of stencil: the template service API, build job waiting,
//! source bundles and the apply pass.

pub mod api;
pub mod apply;
pub mod bundle;
pub mod config;
mod error;
mod http;
pub mod job;

pub use api::{JobApi, JobStatus, ProvisionerJob, ProvisionerLog, Template, TemplateApi};
pub use apply::{apply_at, apply_manifest_at, prune_checkpoint, ApplyReport, BuiltVersion};
pub use config::RemoteConfig;
pub use error::{ApplyError, JobError, RemoteError};
pub use http::HttpClient;
pub use job::{JobWaiter, MAX_JOB_ATTEMPTS};
