use std::time::Duration;

use ingest_core::ClientError;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base of every endpoint, e.g. `http://127.0.0.1:8000/api`.
    pub api_base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit for submissions and questions. Not applied to the
    /// progress stream, which is open-ended.
    pub request_timeout: Duration,
    /// Longest silence tolerated on a progress stream; `None` waits forever.
    pub stall_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            stall_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl EngineConfig {
    pub fn with_base(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// `{api_base_url}/{path}`; the base keeps its own path segments.
    pub(crate) fn endpoint(&self, path: &str) -> Result<reqwest::Url, ClientError> {
        let joined = format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        reqwest::Url::parse(&joined).map_err(|err| {
            ClientError::Validation(format!("bad api base url {:?}: {err}", self.api_base_url))
        })
    }
}
