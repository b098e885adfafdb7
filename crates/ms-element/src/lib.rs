//! `ms-element` — what the scheduler schedules.
//!
//! Elements are the stages of a simulation step.  Each one is asked, for
//! every step, which deferred [`Task`]s it wants to run; the scheduler
//! collects those tasks into batches and the driver runs them.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`task`]     | `Task`, `TaskKind`, `Registrar`                            |
//! | [`element`]  | `SimulatorElement`, `ElementHandle`                        |
//! | [`store`]    | `ElementStore`: ownership, pointer-identity dedupe         |
//! | [`registry`] | `ServiceRegistry`, `ServiceKind`                           |
//! | [`wiring`]   | propagator tags, coupling connections, `Wiring`            |
//! | [`context`]  | `BuildContext`, `BuildElement`                             |
//! | [`stages`]   | state, energy, lambda, forces, propagator, coupling, trajectory |
//! | [`error`]    | `ElementError`, `ElementResult<T>`                         |
//!
//! # Sharing model
//!
//! Everything is single-threaded.  Data shared between elements and the
//! tasks they register lives behind `Rc<RefCell<_>>`; step facts received
//! from signallers live in `Rc<Cell<Option<Step>>>`.  A task must never hold a
//! borrow past its own return.

pub mod context;
pub mod element;
pub mod error;
pub mod registry;
pub mod stages;
pub mod store;
pub mod task;
pub mod wiring;

#[cfg(test)]
mod tests;

pub use context::{BuildContext, BuildElement};
pub use element::{element_handle, ElementHandle, SimulatorElement, TrajectoryWriterCallback};
pub use error::{BoxedError, ElementError, ElementResult};
pub use registry::{ServiceKind, ServiceRegistry};
pub use store::{dedup_ids, ElementStore};
pub use task::{Registrar, Task, TaskFn, TaskKind};
pub use wiring::{
    BoxScaling, PropagatorBarostatConnection, PropagatorTag, PropagatorThermostatConnection,
    Registration, UnmatchedRegistration, VelocityScaling, Wiring,
};
