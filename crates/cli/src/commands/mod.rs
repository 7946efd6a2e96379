//! Subcommand implementations.
//!
//! Every command opens the durable store under the configured data
//! directory, so the session cookie and the cart carry over between runs.

// Commands report to the terminal.
#![allow(clippy::print_stdout)]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::sync::Arc;

use bookstore_client::{
    ClientConfig, ClientError, ConfigError, FileStorage, SessionManager, Storage, StorageError,
};
use thiserror::Error;

/// Errors that can occur while preparing a command.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Configuration could not be read from the environment.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The data directory could not be opened.
    #[error("failed to open data directory: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Shared state for one CLI invocation.
pub struct Context {
    pub session: SessionManager,
    pub storage: Arc<dyn Storage>,
}

impl Context {
    /// Build the session and storage from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if configuration is invalid or the data
    /// directory cannot be opened.
    pub fn from_env() -> Result<Self, ContextError> {
        let config = ClientConfig::from_env()?;
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&config.data_dir)?);
        tracing::debug!(
            api_base = %config.api_base,
            data_dir = %config.data_dir.display(),
            "Opened context"
        );
        let session = SessionManager::new(&config, storage.clone())?;
        Ok(Self { session, storage })
    }
}
