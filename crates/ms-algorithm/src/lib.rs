//! `ms-algorithm` — the modular simulator's scheduler.
//!
//! [`SimulatorAlgorithmBuilder`] collects elements, wires controllers to
//! propagators, and assembles the signaller chain.  The resulting
//! [`SimulatorAlgorithm`] hands out tasks one at a time, regenerating them
//! in batches that end at re-partition steps.
//!
//! # Crate layout
//!
//! | Module         | Contents                                              |
//! |----------------|-------------------------------------------------------|
//! | [`builder`]    | `SimulatorAlgorithmBuilder`                           |
//! | [`algorithm`]  | `SimulatorAlgorithm`, `RunSummary`                    |
//! | [`step_facts`] | `StepFacts`, `SignalHelper`                           |
//! | `signallers`   | signaller construction in build order                 |
//! | [`error`]      | `AlgorithmError`, `AlgorithmResult<T>`                |

pub mod algorithm;
pub mod builder;
pub mod error;
mod signallers;
pub mod step_facts;


pub use algorithm::{
    RunSummary, SharedBatchHelper, SharedPersistence, SharedResetMonitor, SimulatorAlgorithm,
};
pub use builder::SimulatorAlgorithmBuilder;
pub use error::{AlgorithmError, AlgorithmResult};
pub use step_facts::{SignalHelper, StepFacts};
