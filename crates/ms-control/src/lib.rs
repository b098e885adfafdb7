//! `ms-control` — orchestration collaborators of the scheduler.
//!
//! None of these decide physics.  They decide when the run stops, when
//! counters reset, when a checkpoint is written, and when batch-level work
//! (repartitioning, load balancing) happens.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`stop`]       | `StopRequest` (thread-safe), `StopSignal`, `StopHandler`   |
//! | [`reset`]      | `ResetMonitor`, `ResetHandler`                             |
//! | [`walltime`]   | `WallTimeAccounting`                                       |
//! | [`checkpoint`] | `PersistenceScheduler`, `CheckpointHandler`, `CheckpointHelper`, `JsonCheckpointWriter` |
//! | [`balance`]    | `BatchHelper`, `RepartitionHelper`, `LoadBalanceHelper`    |
//! | [`error`]      | `ControlError`, `ControlResult<T>`                         |

pub mod balance;
pub mod checkpoint;
pub mod error;
pub mod reset;
pub mod stop;
pub mod walltime;

#[cfg(test)]
mod tests;

pub use balance::{BatchHelper, LoadBalanceHelper, LoadBalancer, Partitioner, RepartitionHelper};
pub use checkpoint::{
    Checkpoint, CheckpointHandler, CheckpointHelper, CheckpointWriter, JsonCheckpointWriter,
    PersistenceScheduler,
};
pub use error::{ControlError, ControlResult};
pub use reset::{ResetHandler, ResetMonitor};
pub use stop::{StopHandler, StopRequest, StopSignal};
pub use walltime::WallTimeAccounting;
