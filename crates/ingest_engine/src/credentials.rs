use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use engine_logging::{engine_info, engine_warn};
use tempfile::NamedTempFile;
use thiserror::Error;

/// A bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", engine_logging::redact(&self.0))
    }
}

/// Source of the bearer token used for submissions and subscriptions.
///
/// Read before every request; the clients never refresh it themselves.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<Credential>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&self, token: Credential) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential path has no parent directory: {0}")]
    NoParent(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Token kept in a single file, one token per file, surrounding whitespace ignored.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replaces the token file (temp file in the same directory,
    /// then rename).
    pub fn store(&self, token: &Credential) -> Result<(), CredentialError> {
        let dir = match self.path.parent() {
            Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
            Some(dir) => dir,
            None => return Err(CredentialError::NoParent(self.path.clone())),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(token.expose().as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| CredentialError::Io(err.error))?;
        engine_info!("Stored credential {:?} at {:?}", token, self.path);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let token = text.trim();
                (!token.is_empty()).then(|| Credential::new(token))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                engine_warn!("Failed to read credential from {:?}: {}", self.path, err);
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => engine_info!("Cleared credential at {:?}", self.path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => engine_warn!("Failed to clear credential at {:?}: {}", self.path, err),
        }
    }
}
