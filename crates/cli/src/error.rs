//! Error types for CLI operations.

use contracts::{PlatformError, StoreError};
use thiserror::Error;

/// Startup failures of the `run` command
#[derive(Error, Debug)]
pub enum CliError {
    /// Required credential absent from flags and environment
    #[error("missing credential: set {env} or pass --{flag}")]
    MissingCredential {
        env: &'static str,
        flag: &'static str,
    },

    /// Configuration store could not be opened
    #[error("Failed to open configuration store: {0}")]
    StoreOpen(#[from] StoreError),

    /// Chat session rejected or unreachable
    #[error("Failed to establish chat session: {0}")]
    Session(#[from] PlatformError),
}

impl CliError {
    pub fn missing_credential(env: &'static str, flag: &'static str) -> Self {
        Self::MissingCredential { env, flag }
    }
}
