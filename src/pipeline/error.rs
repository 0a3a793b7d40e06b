//! Pipeline-specific error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur within the stream engine.
///
/// `Clone` because errors travel through the graph inside [`Signal::Error`].
///
/// [`Signal::Error`]: crate::pipeline::Signal::Error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxError {
    /// Failure raised by a producer and propagated as a terminal signal.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A value was pushed while the consumer had no outstanding demand.
    #[error("Demand violation: {attempted} value(s) emitted with {outstanding} outstanding demand")]
    DemandViolation { outstanding: u64, attempted: u64 },

    /// The verification harness observed a signal that does not match its script.
    #[error("Script mismatch at step {index}: expected {expected}, got {actual} (observed: [{}])", .observed.join(", "))]
    ScriptMismatch {
        index: usize,
        expected: String,
        actual: String,
        observed: Vec<String>,
    },

    /// The verification harness gave up waiting for the pipeline.
    #[error("Timed out after {bound:?} waiting for {waiting_for} (observed: [{}])", .observed.join(", "))]
    Timeout {
        bound: Duration,
        waiting_for: String,
        observed: Vec<String>,
    },

    /// The executor refused or failed to start a task.
    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Subscription not active")]
    NotActive,
}

impl FluxError {
    /// Shorthand for a producer failure with a message.
    pub fn upstream(message: impl Into<String>) -> Self {
        FluxError::Upstream(message.into())
    }

    /// Human-readable message without the variant prefix, for upstream errors.
    ///
    /// This is what `expect_error_message` compares against.
    pub fn message(&self) -> String {
        match self {
            FluxError::Upstream(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error belongs to the harness taxonomy (mismatch / timeout).
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            FluxError::ScriptMismatch { .. } | FluxError::Timeout { .. }
        )
    }
}

pub type FluxResult<T> = std::result::Result<T, FluxError>;
