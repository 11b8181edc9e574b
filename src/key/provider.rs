use crate::error::KeyError;
use std::path::PathBuf;

/// Read contract for raw key material.
///
/// Implementations only fetch the configured string; trimming and parsing
/// happen in [`Key::parse`](super::Key::parse).
pub trait KeyProvider: Send + Sync {
    fn raw_key(&self) -> Result<String, KeyError>;
}

/// A key supplied directly, e.g. from the command line or configuration.
#[derive(Debug, Clone)]
pub struct StaticKey(String);

impl StaticKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl KeyProvider for StaticKey {
    fn raw_key(&self) -> Result<String, KeyError> {
        Ok(self.0.clone())
    }
}

/// A key read from an environment variable at call time.
#[derive(Debug, Clone)]
pub struct EnvKey {
    var: String,
}

impl EnvKey {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeyProvider for EnvKey {
    fn raw_key(&self) -> Result<String, KeyError> {
        std::env::var(&self.var).map_err(|e| KeyError::Unavailable {
            source_name: format!("environment variable {}", self.var),
            reason: e.to_string(),
        })
    }
}

/// A key stored as the whole contents of a file (a one-value `.env`).
#[derive(Debug, Clone)]
pub struct FileKey {
    path: PathBuf,
}

impl FileKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyProvider for FileKey {
    fn raw_key(&self) -> Result<String, KeyError> {
        std::fs::read_to_string(&self.path).map_err(|e| KeyError::Unavailable {
            source_name: format!("key file {}", self.path.display()),
            reason: e.to_string(),
        })
    }
}
