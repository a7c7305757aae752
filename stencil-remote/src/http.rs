//! Blocking HTTP implementation of [`TemplateApi`] over `ureq`.
//!
//! Build logs are read from `templateversions/{id}/logs?follow=true` as
//! newline-delimited JSON on a plain HTTP response (`Accept:
//! application/x-ndjson`), one [`ProvisionerLog`] per line, until the server
//! closes the body. Deployments that only serve that endpoint as a websocket
//! upgrade are not supported by this client.
//!
//! The log stream uses its own agent without a read timeout: a build may stay
//! silent for longer than [`RemoteConfig::timeout`] without the stream being
//! closed.

use std::io::{BufRead, BufReader};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use stencil_core::{TemplateName, VersionId};

use crate::api::{
    CreateTemplateRequest, CreateVersionRequest, JobApi, LogStream, ProvisionerJob,
    ProvisionerLog, Template, TemplateApi, TemplateId, TemplateVersion,
};
use crate::config::RemoteConfig;
use crate::error::RemoteError;

const SESSION_HEADER: &str = "Coder-Session-Token";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    hash: String,
}

const USER_AGENT: &str = concat!("stencil/", env!("CARGO_PKG_VERSION"));

/// Remote client bound to one [`RemoteConfig`].
pub struct HttpClient {
    agent: ureq::Agent,
    stream_agent: ureq::Agent,
    config: RemoteConfig,
}

impl HttpClient {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .user_agent(USER_AGENT)
            .build();
        let stream_agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            stream_agent,
            config,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn request(&self, method: &'static str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set(SESSION_HEADER, &self.config.token)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.config.endpoint(path);
        let response = send("GET", &url, self.request("GET", &url).call())?;
        decode(&url, response)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        body: impl serde::Serialize,
    ) -> Result<T, RemoteError> {
        let url = self.config.endpoint(path);
        let response = send(method, &url, self.request(method, &url).send_json(body))?;
        decode(&url, response)
    }

    fn organization_path(&self, rest: &str) -> String {
        format!("organizations/{}/{rest}", self.config.organization)
    }
}

impl JobApi for HttpClient {
    fn version_job(&self, version: &VersionId) -> Result<ProvisionerJob, RemoteError> {
        let version: TemplateVersion = self.get_json(&format!("templateversions/{version}"))?;
        Ok(version.job)
    }

    fn stream_logs(&self, version: &VersionId, after: i64) -> Result<LogStream<'_>, RemoteError> {
        let url = self
            .config
            .endpoint(&format!("templateversions/{version}/logs"));
        let response = send(
            "GET",
            &url,
            self.stream_agent
                .get(&url)
                .set(SESSION_HEADER, &self.config.token)
                .query("after", &after.to_string())
                .query("follow", "true")
                .set("Accept", "application/x-ndjson")
                .call(),
        )?;

        let lines = BufReader::new(response.into_reader()).lines();
        Ok(Box::new(lines.filter_map(move |line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str::<ProvisionerLog>(&line).map_err(|e| RemoteError::Log {
                    url: url.clone(),
                    source: e,
                }),
            ),
            Err(e) => Some(Err(RemoteError::Decode {
                url: url.clone(),
                source: e,
            })),
        })))
    }
}

impl TemplateApi for HttpClient {
    fn template_by_name(&self, name: &TemplateName) -> Result<Option<Template>, RemoteError> {
        let path = self.organization_path(&format!("templates/{name}"));
        match self.get_json(&path) {
            Ok(template) => Ok(Some(template)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create_template(&self, request: &CreateTemplateRequest) -> Result<Template, RemoteError> {
        self.send_json("POST", &self.organization_path("templates"), request)
    }

    fn upload_bundle(&self, bundle: Vec<u8>) -> Result<String, RemoteError> {
        let url = self.config.endpoint("files");
        let response = send(
            "POST",
            &url,
            self.request("POST", &url)
                .set("Content-Type", "application/x-tar")
                .send_bytes(&bundle),
        )?;
        let upload: UploadResponse = decode(&url, response)?;
        Ok(upload.hash)
    }

    fn create_version(
        &self,
        request: &CreateVersionRequest,
    ) -> Result<TemplateVersion, RemoteError> {
        self.send_json("POST", &self.organization_path("templateversions"), request)
    }

    fn version(&self, id: &VersionId) -> Result<Option<TemplateVersion>, RemoteError> {
        match self.get_json(&format!("templateversions/{id}")) {
            Ok(version) => Ok(Some(version)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn rename_version(&self, id: &VersionId, name: &str) -> Result<TemplateVersion, RemoteError> {
        self.send_json(
            "PATCH",
            &format!("templateversions/{id}"),
            json!({ "name": name }),
        )
    }

    fn activate_version(&self, template: &TemplateId, id: &VersionId) -> Result<(), RemoteError> {
        let url = self.config.endpoint(&format!("templates/{template}/versions"));
        send(
            "PATCH",
            &url,
            self.request("PATCH", &url).send_json(json!({ "id": id })),
        )?;
        Ok(())
    }
}

/// Map a ureq result onto [`RemoteError`], reading the service's error body.
fn send(
    method: &'static str,
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, RemoteError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(RemoteError::Status {
                method,
                url: url.to_string(),
                status,
                message: error_message(&body),
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport {
            method,
            url: url.to_string(),
            reason: transport.to_string(),
        }),
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, RemoteError> {
    response.into_json().map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        source: e,
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if parsed.detail.is_empty() => parsed.message,
        Ok(parsed) => format!("{} ({})", parsed.message, parsed.detail),
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
