use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use ingest_core::{validate_url, ClientError, FileUpload, TaskId};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::http::{build_client, check_status, map_reqwest_error, read_json, require_credential};
use crate::{CredentialStore, EngineConfig};

#[derive(Debug, Deserialize)]
struct TaskAccepted {
    task_id: String,
}

/// Turns a document or a URL into a running backend task.
///
/// One request per call, no retries.
#[async_trait::async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit_file(&self, file: FileUpload) -> Result<TaskId, ClientError>;

    async fn submit_url(&self, url: &str) -> Result<TaskId, ClientError>;
}

pub struct ReqwestSubmitter {
    config: EngineConfig,
    credentials: Arc<dyn CredentialStore>,
    client: reqwest::Client,
}

impl ReqwestSubmitter {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let client = build_client(config.connect_timeout, Some(config.request_timeout))?;
        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<TaskId, ClientError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let accepted: TaskAccepted = read_json(response).await?;
        if accepted.task_id.trim().is_empty() {
            return Err(ClientError::Protocol("server returned an empty task_id".into()));
        }
        Ok(TaskId::new(accepted.task_id))
    }
}

#[async_trait::async_trait]
impl TaskSubmitter for ReqwestSubmitter {
    async fn submit_file(&self, file: FileUpload) -> Result<TaskId, ClientError> {
        let credential = require_credential(self.credentials.as_ref())?;
        let endpoint = self.config.endpoint("upload-and-process")?;
        engine_info!(
            "Uploading {} ({} bytes, {}) with {:?}",
            file.filename,
            file.bytes.len(),
            file.content_type,
            credential
        );

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|err| ClientError::Validation(format!("bad content type: {err}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, credential.bearer())
            .multipart(form);
        let result = self.send(request).await;
        if let Err(err) = &result {
            engine_warn!("Upload failed: {}", err);
        }
        result
    }

    async fn submit_url(&self, url: &str) -> Result<TaskId, ClientError> {
        let url = validate_url(url)?;
        let credential = require_credential(self.credentials.as_ref())?;
        let endpoint = self.config.endpoint("scrape-and-ingest")?;
        engine_info!("Requesting scrape of {} with {:?}", url, credential);

        let request = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, credential.bearer())
            .json(&serde_json::json!({ "url": url.as_str() }));
        let result = self.send(request).await;
        if let Err(err) = &result {
            engine_warn!("Scrape request for {} failed: {}", url, err);
        }
        result
    }
}
