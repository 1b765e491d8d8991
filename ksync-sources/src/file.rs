//! Secrets from a local JSON file: `[{"key": .., "value": .., "note": ..}]`.

use std::fs;
use std::path::{Path, PathBuf};

use ksync_core::{Scope, Secret, SecretsSource, SourceError};

use crate::error::SourceConfigError;

/// Re-reads the file on every fetch, so edits show up on the next pass.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SourceConfigError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(SourceConfigError::Missing("secrets file path"));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretsSource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    /// The file has no notion of projects; every scope sees every entry.
    fn fetch_all(&self, scope: &Scope) -> Result<Vec<Secret>, SourceError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|err| SourceError::io(self.path.display().to_string(), err))?;
        let secrets: Vec<Secret> = serde_json::from_str(&raw)
            .map_err(|err| SourceError::Decode(format!("{}: {err}", self.path.display())))?;

        tracing::debug!(
            path = %self.path.display(),
            scope = %scope,
            count = secrets.len(),
            "read secrets file"
        );
        Ok(secrets)
    }
}
