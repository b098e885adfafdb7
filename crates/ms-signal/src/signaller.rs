//! The `Signaller` trait and the callback/event types clients register.

use ms_core::{Step, Time};

use crate::SignalResult;

/// Callback fired by a signaller on a step it is responsible for.
///
/// Clients capture whatever shared cell they need to update; the callback
/// itself carries no return value.
pub type SignallerCallback = Box<dyn FnMut(Step, Time)>;

/// Events the energy signaller distinguishes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EnergySignallerEvent {
    EnergyCalculationStep,
    VirialCalculationStep,
    FreeEnergyCalculationStep,
}

impl EnergySignallerEvent {
    pub const ALL: [EnergySignallerEvent; 3] = [
        EnergySignallerEvent::EnergyCalculationStep,
        EnergySignallerEvent::VirialCalculationStep,
        EnergySignallerEvent::FreeEnergyCalculationStep,
    ];
}

/// Events the trajectory signaller distinguishes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TrajectoryEvent {
    StateWritingStep,
    EnergyWritingStep,
}

impl TrajectoryEvent {
    pub const ALL: [TrajectoryEvent; 2] =
        [TrajectoryEvent::StateWritingStep, TrajectoryEvent::EnergyWritingStep];
}

/// A stage that precomputes a per-step fact and notifies its clients.
///
/// Lifecycle: built (clients registered) → `setup()` once → `signal()` any
/// number of times.  The scheduler notifies every signaller at least twice
/// per step: once when a batch starts and once after advancing the step,
/// so `signal` must be idempotent for a given step.
pub trait Signaller {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Called once, before the first batch is generated.
    fn setup(&mut self) -> SignalResult<()> {
        Ok(())
    }

    /// Notify clients if `step` is one of this signaller's steps.
    fn signal(&mut self, step: Step, time: Time);
}
