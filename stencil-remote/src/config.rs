//! Connection settings for the remote service.

use std::time::Duration;

/// Default per-request connect/read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Organization used when none is configured.
pub const DEFAULT_ORGANIZATION: &str = "default";

/// Remote endpoint and credentials, handed to [`HttpClient::new`](crate::HttpClient::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://coder.example.com`.
    pub url: String,
    pub token: String,
    pub organization: String,
    /// Applies to connecting and to each individual read of ordinary
    /// requests. The followed log stream has no read timeout, and nothing
    /// bounds the total time spent waiting for a build job.
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// `<url>/api/v2/<path>` with exactly one slash between the parts.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v2/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
