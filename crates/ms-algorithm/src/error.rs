//! Error type for assembling and running the algorithm.

use ms_control::ControlError;
use ms_core::{CoreError, ElementId};
use ms_element::{ElementError, PropagatorTag};
use ms_signal::SignalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error("the algorithm was already built; a builder builds exactly one")]
    AlreadyBuilt,

    #[error("cannot add elements after the algorithm was built")]
    AddAfterBuild,

    #[error("element builder returned {0}, which is not in the element store")]
    ElementNotFound(ElementId),

    #[error("{controller} targets propagator `{target}`, but no propagator offers that tag")]
    UnmatchedRegistration {
        controller: &'static str,
        target:     PropagatorTag,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Element(#[from] ElementError),

    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Shorthand result type for `ms-algorithm`.
pub type AlgorithmResult<T> = Result<T, AlgorithmError>;
