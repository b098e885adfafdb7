//! Error type for tasks and stage assembly.

use ms_core::Step;
use ms_signal::SignalError;
use thiserror::Error;

/// Boxed error from a collaborator outside this crate (trajectory sink,
/// checkpoint writer, force provider).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ElementError {
    /// A task or an external numerics provider reported a failure.
    #[error("{element} failed at step {step}: {reason}")]
    Failed {
        element: &'static str,
        step:    Step,
        reason:  String,
    },

    /// A stage needs a connection that was never made during assembly.
    #[error("{element} has no {connection} connection")]
    MissingConnection {
        element:    &'static str,
        connection: &'static str,
    },

    /// Checkpoint data for a client could not be restored.
    #[error("cannot restore checkpoint data for {key}: {reason}")]
    Checkpoint {
        key:    &'static str,
        reason: String,
    },

    #[error("{name}: {source}")]
    Collaborator {
        name:   &'static str,
        #[source]
        source: BoxedError,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl ElementError {
    /// Wrap an error raised by an external collaborator.
    pub fn collaborator(name: &'static str, source: impl Into<BoxedError>) -> Self {
        ElementError::Collaborator { name, source: source.into() }
    }
}

/// Shorthand result type for `ms-element`.
pub type ElementResult<T> = Result<T, ElementError>;
