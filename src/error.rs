//! Error handling for rxflow
//!
//! Stream failures live in [`FluxError`](crate::pipeline::FluxError) because
//! they travel through the graph as signals. This module holds the
//! application-level error used by configuration loading and the binary.

use crate::pipeline::FluxError;
use thiserror::Error;

/// Main error type for rxflow operations
#[derive(Error, Debug)]
pub enum RxflowError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stream engine errors, including verification failures
    #[error(transparent)]
    Pipeline(#[from] FluxError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RxflowError>,
    },
}

impl RxflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RxflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The wrapped stream error, looking through any context layers.
    pub fn as_flux(&self) -> Option<&FluxError> {
        match self {
            RxflowError::Pipeline(e) => Some(e),
            RxflowError::WithContext { source, .. } => source.as_flux(),
            _ => None,
        }
    }
}

/// Result type alias for rxflow operations
pub type Result<T> = std::result::Result<T, RxflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RxflowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
