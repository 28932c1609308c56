//! RON configuration for the `ingest` binary.
//!
//! Every field is optional in the file; missing fields take the defaults
//! below. Example `ingest.ron`:
//!
//! ```ron
//! (
//!     api_base_url: "http://127.0.0.1:8000/api",
//!     stall_timeout_secs: Some(300),
//!     token_file: ".ingest_token",
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_info;
use ingest_core::UploadPolicy;
use ingest_engine::EngineConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "ingest.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// `None` waits for progress forever.
    pub stall_timeout_secs: Option<u64>,
    pub token_file: PathBuf,
    /// `None` disables the log file.
    pub log_file: Option<PathBuf>,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        let policy = UploadPolicy::default();
        Self {
            api_base_url: engine.api_base_url,
            connect_timeout_secs: engine.connect_timeout.as_secs(),
            request_timeout_secs: engine.request_timeout.as_secs(),
            stall_timeout_secs: engine.stall_timeout.map(|limit| limit.as_secs()),
            token_file: PathBuf::from(".ingest_token"),
            log_file: Some(PathBuf::from("ingest.log")),
            allowed_extensions: policy.allowed_extensions,
            max_upload_bytes: policy.max_bytes,
        }
    }
}

impl AppConfig {
    /// An explicit path must exist; otherwise `./ingest.ron` is used when
    /// present and the defaults when not.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => Self::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
        }
    }

    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::default())
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = ron::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            api_base_url: self.api_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stall_timeout: self.stall_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_extensions: self
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes: self.max_upload_bytes,
        }
    }
}
