//! Error types for finrec
//!
//! `AppError` is the only error a caller of the orchestration layer ever sees.
//! Backend failures are expressed as [`ProviderError`] and are absorbed by the
//! fallback chain long before they reach a caller.

use crate::providers::ProviderError;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    /// A catalog, profile or history file passed on the command line
    #[error("Failed to load input file {path}: {reason}")]
    InputFile { path: String, reason: String },

    /// `process_query` was called before `initialize()`
    #[error("Orchestration manager is not initialized; call initialize() first")]
    NotInitialized,

    /// `initialize()` was called on a manager that already left the uninitialized phase
    #[error("Orchestration manager is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
