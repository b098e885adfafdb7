//! Error type for the orchestration helpers.

use std::path::PathBuf;

use ms_core::Step;
use ms_element::ElementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("checkpoint I/O error at {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A checkpoint client could not produce its data.
    #[error(transparent)]
    Element(#[from] ElementError),

    /// An external batch helper (partitioner, load balancer) failed.
    #[error("{helper} failed at step {step}: {reason}")]
    Helper {
        helper: &'static str,
        step:   Step,
        reason: String,
    },
}

/// Shorthand result type for `ms-control`.
pub type ControlResult<T> = Result<T, ControlError>;

/// Tasks report the errors of helpers they call as element errors.
impl From<ControlError> for ElementError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Element(inner) => inner,
            other => ElementError::collaborator("checkpoint", other),
        }
    }
}
