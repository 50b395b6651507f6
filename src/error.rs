//! Error handling for the instrument explorer
//!
//! This module defines the crate error type and a Result alias. Parse and
//! transport-mismatch problems are recovered where they happen; persistence
//! and discovery failures reach the caller as recoverable errors.

use thiserror::Error;

/// Main error type for instrument explorer operations
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// A discovery record could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The persistence store rejected a read or write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The discovery service or process failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation referenced an instrument the model does not know
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The model mutex was poisoned by a panicking holder
    #[error("Model lock poisoned: {0}")]
    LockPoisoned(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors from the RPC client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ExplorerError>,
    },
}

impl ExplorerError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ExplorerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the failed operation may simply be retried on a later cycle
    pub fn is_recoverable(&self) -> bool {
        match self {
            ExplorerError::Persistence(_)
            | ExplorerError::Discovery(_)
            | ExplorerError::Timeout(_)
            | ExplorerError::Http(_)
            | ExplorerError::Io(_) => true,
            ExplorerError::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Result type alias for instrument explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
