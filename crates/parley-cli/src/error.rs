//! Error handling for the Parley CLI

use thiserror::Error;

use parley_core::{IngestError, ParleyError, StartupFailure, TransportError};

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Parley core error: {0}")]
    Core(#[from] ParleyError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("{failure}: {reason}")]
    Startup {
        failure: StartupFailure,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Operation(String),
}

impl CliError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Startup { failure, .. } => failure.exit_code(),
            CliError::Ingest(e) => e.failure().exit_code(),
            _ => 1,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Operation(format!("{:#}", err))
    }
}
