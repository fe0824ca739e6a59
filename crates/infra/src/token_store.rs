//! File-backed durable token cache
//!
//! Keeps the last issued bearer token in a plain text file (by default
//! `TOKEN` in the working directory) so a restarted process can resume its
//! session through the check endpoint instead of logging in again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use odp_session_core::TokenStore;
use odp_session_domain::{Result, SessionError};
use tracing::debug;

use crate::errors::InfraError;

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(err: std::io::Error) -> SessionError {
    InfraError::from(err).into()
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    async fn save(&self, token: &str) -> Result<()> {
        // readers never observe a partially written token
        let staging = self.staging_path();
        tokio::fs::write(&staging, token).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(io_error)?;
        debug!(path = %self.path.display(), "session token persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }
}
