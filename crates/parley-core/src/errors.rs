//! Error types for the Parley session core
//!
//! Failures are split by concern: transport, rendering, configuration and the ingestion
//! startup path. [`ParleyError`] unifies them for callers that just want `?`.
//!
//! Administrative misuse (adding a duplicate name, removing an out-of-range rank) is not
//! an error at all; those operations report `false` instead.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures reading from or closing a message transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not available: {reason}")]
    Unavailable { reason: String },
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },
    #[error("Transport already closed")]
    Closed,
}

impl TransportError {
    /// Create a malformed-payload error from any displayable cause
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        TransportError::Malformed {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::malformed(err)
    }
}

/// Failures reported by a render sink
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Render sink rejected content: {reason}")]
    Rejected { reason: String },
    #[error("Render I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid session configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Process exit codes for failures that cannot be recovered inside the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupFailure {
    /// The inbound message stream never became available
    ClientInputStream,
    /// The outbound command stream could not be opened
    ClientOutputStream,
    /// The server could not be reached
    ClientConnection,
}

impl StartupFailure {
    /// Exit code handed to the operating system
    pub fn exit_code(self) -> i32 {
        match self {
            StartupFailure::ClientConnection => 2,
            StartupFailure::ClientInputStream => 3,
            StartupFailure::ClientOutputStream => 4,
        }
    }
}

impl std::fmt::Display for StartupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupFailure::ClientConnection => write!(f, "CLIENT_CONNECTION"),
            StartupFailure::ClientInputStream => write!(f, "CLIENT_INPUT_STREAM"),
            StartupFailure::ClientOutputStream => write!(f, "CLIENT_OUTPUT_STREAM"),
        }
    }
}

/// Fatal ingestion failures
///
/// Everything that goes wrong after the stream is established is handled inside the
/// loop; only the startup path escapes.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{failure}: input stream unavailable: {reason}")]
    StreamUnavailable {
        failure: StartupFailure,
        reason: String,
    },
}

impl IngestError {
    /// Startup failure category, used by binaries to pick an exit code
    pub fn failure(&self) -> StartupFailure {
        match self {
            IngestError::StreamUnavailable { failure, .. } => *failure,
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the Parley session core
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
}

pub type Result<T> = core::result::Result<T, ParleyError>;
