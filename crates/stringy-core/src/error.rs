//! Error types for Stringy.
//!
//! Every failure a caller can observe across the process boundary is one of
//! four contract kinds: `NotFound`, `Unavailable`, transport failure, or
//! application failure. The remaining variants are local infrastructure
//! errors (registry database, I/O, configuration).

use crate::ipc::protocol::codes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Stringy.
#[derive(Debug, Error)]
pub enum StringyError {
    // Resolution errors
    #[error("Interface {interface}@{version} is not registered")]
    NotFound { interface: String, version: String },

    #[error("Interface {interface}@{version} unavailable after waiting {waited:?}")]
    Unavailable {
        interface: String,
        version: String,
        waited: Duration,
    },

    // Transport errors
    #[error("Service instance lost (PID {pid}, port {port})")]
    InstanceLost { pid: u32, port: u16 },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Service handle for {interface} is closed")]
    HandleClosed { interface: String },

    // Application errors
    #[error("Remote operation failed ({code}): {message}")]
    Application { code: i32, message: String },

    #[error("Unknown method: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Stringy operations.
pub type Result<T> = std::result::Result<T, StringyError>;

/// Outcome of one dispatched call.
pub type CallResult<T> = Result<T>;

impl From<std::io::Error> for StringyError {
    fn from(err: std::io::Error) -> Self {
        StringyError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for StringyError {
    fn from(err: serde_json::Error) -> Self {
        StringyError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for StringyError {
    fn from(err: rusqlite::Error) -> Self {
        StringyError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl StringyError {
    /// Create a transport error from any displayable cause.
    pub fn transport(message: impl Into<String>) -> Self {
        StringyError::Transport {
            message: message.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        StringyError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// True for failures reaching or talking to the remote instance.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            StringyError::InstanceLost { .. }
                | StringyError::Transport { .. }
                | StringyError::HandleClosed { .. }
        )
    }

    /// True for domain errors reported by the remote operation itself.
    pub fn is_application_failure(&self) -> bool {
        matches!(self, StringyError::Application { .. })
    }

    /// JSON-RPC error code a service reports this error with.
    ///
    /// Application errors keep their own code; validation failures use
    /// -32005 from the application range (-32000 to -32099).
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            StringyError::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            StringyError::InvalidParams { .. } | StringyError::Json { .. } => codes::INVALID_PARAMS,
            StringyError::Application { code, .. } => *code,
            StringyError::Validation { .. } => -32005,
            _ => codes::INTERNAL_ERROR,
        }
    }

    /// Classify a JSON-RPC error returned by the remote side.
    ///
    /// Parse, invalid-request and invalid-params codes mean the request or
    /// its arguments could not be demarshaled, which is a transport concern.
    /// Every other code is the remote operation's own failure.
    pub fn from_rpc_error(code: i32, message: String) -> Self {
        match code {
            codes::PARSE_ERROR | codes::INVALID_REQUEST | codes::INVALID_PARAMS => {
                StringyError::Transport {
                    message: format!("remote rejected request ({}): {}", code, message),
                }
            }
            _ => StringyError::Application { code, message },
        }
    }
}
