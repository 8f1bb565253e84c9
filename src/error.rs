//! Unified error handling for the endor crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available where a caller needs the detail.
//!
//! # Architecture
//!
//! - [`EndorErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Only per-cannon status failures are swallowed (inside the fan-out round).
//! Everything that reaches this type terminates the attack that raised it.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::cannon::CannonError;
pub use crate::fleet::FleetError;

/// Common trait for all endor error types
pub trait EndorErrorTrait: std::error::Error {
    /// Check if this error is transient (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Stable machine-readable code used in client-facing payloads
    fn kind(&self) -> &'static str;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unresolvable caller input
    Request,
    /// Target selection produced nothing
    Targeting,
    /// Cannon status, selection, or fire failures
    Backend,
    /// Configuration and validation errors
    Config,
    /// Storage and I/O errors
    Io,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Targeting => "targeting",
            Self::Backend => "backend",
            Self::Config => "config",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the endor crate
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown protocol tag in a request
    #[error("cannot parse [{0}] as a protocol type")]
    InvalidProtocolTag(String),

    /// Unknown enemy type in a request
    #[error("cannot parse [{0}] as an enemy type")]
    InvalidEnemyType(String),

    /// Request failed field validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The pipeline left no candidate scans
    #[error("no valid target encountered")]
    EmptyTargetSet,

    /// Fan-out, selection, or dispatch failure
    #[error(transparent)]
    Fleet(#[from] FleetError),

    /// Cannon transport error outside an attack (e.g. client construction)
    #[error("Cannon error: {0}")]
    Cannon(#[from] CannonError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl EndorErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fleet(e) => e.is_recoverable(),
            Self::Cannon(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::InvalidProtocolTag(_)
            | Self::InvalidEnemyType(_)
            | Self::InvalidRequest(_)
            | Self::EmptyTargetSet
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other { .. } => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidProtocolTag(_) => "invalid_protocol_tag",
            Self::InvalidEnemyType(_) => "invalid_enemy_type",
            Self::InvalidRequest(_) => "invalid_request",
            Self::EmptyTargetSet => "empty_target_set",
            Self::Fleet(e) => e.kind(),
            Self::Cannon(e) => e.kind(),
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Config(_) => "config_error",
            Self::Other { .. } => "internal_error",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidProtocolTag(_)
            | Self::InvalidEnemyType(_)
            | Self::InvalidRequest(_)
            | Self::Json(_) => ErrorCategory::Request,
            Self::EmptyTargetSet => ErrorCategory::Targeting,
            Self::Fleet(FleetError::InvalidCapacity) => ErrorCategory::Config,
            Self::Fleet(_) | Self::Cannon(_) => ErrorCategory::Backend,
            Self::Io(_) => ErrorCategory::Io,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a request validation error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
