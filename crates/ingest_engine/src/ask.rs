use std::sync::Arc;

use engine_logging::engine_info;
use ingest_core::ClientError;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::http::{build_client, check_status, map_reqwest_error, read_json, require_credential};
use crate::{CredentialStore, EngineConfig};

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    collection_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

/// Asks questions against an ingested collection.
pub struct QuestionClient {
    config: EngineConfig,
    credentials: Arc<dyn CredentialStore>,
    client: reqwest::Client,
}

impl QuestionClient {
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

    pub async fn ask(&self, question: &str, collection: &str) -> Result<String, ClientError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::Validation("question is empty".into()));
        }
        if collection.trim().is_empty() {
            return Err(ClientError::Validation("collection name is empty".into()));
        }
        let credential = require_credential(self.credentials.as_ref())?;
        let endpoint = self.config.endpoint("ask")?;
        engine_info!("Asking collection {} ({} chars)", collection, question.len());

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, credential.bearer())
            .json(&AskRequest {
                question,
                collection_name: collection,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let body: AskResponse = read_json(response).await?;
        Ok(body.answer)
    }
}
