//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors raised while validating core inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{name} must be non-negative, got {value}")]
    NegativeInterval {
        name:  &'static str,
        value: i64,
    },
}

/// Shorthand result type for `ms-core`.
pub type CoreResult<T> = Result<T, CoreError>;
