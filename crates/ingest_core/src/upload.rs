use crate::ClientError;

/// A document picked for ingestion.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

// Payloads can be megabytes; keep them out of debug output.
impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Which files the dashboard lets through to the submission client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["pdf".to_string()],
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, file: &FileUpload) -> Result<(), ClientError> {
        if file.bytes.is_empty() {
            return Err(ClientError::Validation(format!(
                "{} is empty",
                file.filename
            )));
        }
        let size = file.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(ClientError::Validation(format!(
                "{} is {size} bytes, limit is {}",
                file.filename, self.max_bytes
            )));
        }
        match file.extension() {
            Some(ext) if self.allowed_extensions.iter().any(|allowed| *allowed == ext) => Ok(()),
            _ => Err(ClientError::Validation(format!(
                "{} is not an accepted file type (accepted: {})",
                file.filename,
                self.allowed_extensions.join(", ")
            ))),
        }
    }
}

/// Checks that `raw` is a non-empty absolute http(s) URL and returns it trimmed.
pub fn validate_url(raw: &str) -> Result<url::Url, ClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("url is empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|err| ClientError::Validation(format!("malformed url {trimmed:?}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(ClientError::Validation(format!(
            "url must be absolute http(s): {trimmed:?}"
        ))),
    }
}
