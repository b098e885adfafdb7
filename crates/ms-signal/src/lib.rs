//! `ms-signal` — signallers that precompute per-step facts.
//!
//! Signallers run before any element decides what to do for a step.  Each
//! one owns a list of client callbacks and fires them on the steps it is
//! responsible for; clients record the step and adapt the tasks they
//! schedule.
//!
//! # Crate layout
//!
//! | Module              | Contents                                               |
//! |---------------------|--------------------------------------------------------|
//! | [`signaller`]       | `Signaller` trait, `SignallerCallback`, event enums     |
//! | [`client`]          | `SignallerClient`: opt-in registration hooks            |
//! | [`builder`]         | `SignallerBuilder`, `EventSignallerBuilder`            |
//! | [`neighbor_search`] | `NeighborSearchSignaller`                              |
//! | [`last_step`]       | `LastStepSignaller`                                    |
//! | [`logging`]         | `LoggingSignaller`                                     |
//! | [`trajectory`]      | `TrajectorySignaller`                                  |
//! | [`energy`]          | `EnergySignaller`                                      |
//! | [`stop`]            | `StopMonitor`, consumed by the last-step signaller     |
//! | [`error`]           | `SignalError`, `SignalResult<T>`                       |
//!
//! # Call order
//!
//! Several signallers are clients of others, and a client must be called
//! *after* the signaller it listens to.  Registration happens when a
//! signaller is built, so signallers are built in the reverse of their call
//! order:
//!
//! ```text
//! build order:  energy → trajectory → logging → last step → neighbor search
//! call order:   neighbor search → last step → logging → trajectory → energy
//! ```

pub mod builder;
pub mod client;
pub mod energy;
pub mod error;
pub mod last_step;
pub mod logging;
pub mod neighbor_search;
pub mod signaller;
pub mod stop;
pub mod trajectory;

#[cfg(test)]
mod tests;

pub use builder::{EventSignallerBuilder, SignallerBuilder};
pub use client::SignallerClient;
pub use energy::EnergySignaller;
pub use error::{SignalError, SignalResult};
pub use last_step::LastStepSignaller;
pub use logging::LoggingSignaller;
pub use neighbor_search::NeighborSearchSignaller;
pub use signaller::{EnergySignallerEvent, Signaller, SignallerCallback, TrajectoryEvent};
pub use stop::{NeverStop, SharedStopMonitor, StopMonitor};
pub use trajectory::{TrajectoryIntervals, TrajectorySignaller};
