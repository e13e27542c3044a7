//! Error types for the conversion client.
//!
//! # Design
//! Every failure the user can see collapses into one `ConversionError`: a
//! human-readable message plus an `ErrorKind` saying where it came from. The
//! other error types here live at the seams (transport, telemetry, config)
//! and are converted into `ConversionError` or swallowed before they reach
//! the state machine.

use std::fmt;

use thiserror::Error;

/// Message used when a body matches none of the known response schemas.
pub const INVALID_RESPONSE_FORMAT: &str = "Invalid response format from server";

/// Message used when the service flags an error without describing it.
pub const UNKNOWN_SERVER_ERROR: &str = "Unknown error occurred";

/// Where a conversion failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before any network call (empty or whitespace-only).
    Validation,
    /// The request never produced a response body.
    Transport,
    /// The service answered with an `error`/`details` field or a non-2xx status.
    ServerReported,
    /// The service answered 2xx with a body we cannot interpret.
    MalformedResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::ServerReported => "server-reported",
            ErrorKind::MalformedResponse => "malformed-response",
        };
        f.write_str(name)
    }
}

/// A failed conversion, ready to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
    pub kind: ErrorKind,
}

impl ConversionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn server_reported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerReported, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// The canonical "none of the known schemas matched" error.
    pub fn invalid_format() -> Self {
        Self::malformed(INVALID_RESPONSE_FORMAT)
    }
}

/// A network-level failure: no HTTP response was obtained.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for ConversionError {
    fn from(err: TransportError) -> Self {
        ConversionError::transport(err.0)
    }
}

/// A telemetry sink refused or failed to record an event.
#[derive(Debug, Clone, Error)]
#[error("telemetry failed: {0}")]
pub struct TelemetryError(pub String);

/// Errors raised while resolving client settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown execution context {0:?} (expected \"local\" or \"deployed\")")]
    UnknownContext(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("timeout_secs in {path} must be greater than zero")]
    ZeroTimeout { path: String },
}
