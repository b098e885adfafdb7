//! Opt-in registration hooks for signaller clients.

use crate::{EnergySignallerEvent, SignallerCallback, TrajectoryEvent};

/// Implemented by anything that wants to hear from a signaller.
///
/// Every hook defaults to `None` ("not interested"), so a stage only
/// overrides the ones it cares about.  The algorithm builder calls every
/// hook exactly once per client, before the signallers are built.
pub trait SignallerClient {
    /// Re-partition (neighbor-search) steps.
    fn register_ns_callback(&mut self) -> Option<SignallerCallback> {
        None
    }

    /// The last step of the run, once it is known.
    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        None
    }

    /// Steps whose energies are logged.
    fn register_logging_callback(&mut self) -> Option<SignallerCallback> {
        None
    }

    /// Energy, virial, and free-energy calculation steps.
    fn register_energy_callback(
        &mut self,
        _event: EnergySignallerEvent,
    ) -> Option<SignallerCallback> {
        None
    }

    /// State- and energy-writing steps.
    fn register_trajectory_signaller_callback(
        &mut self,
        _event: TrajectoryEvent,
    ) -> Option<SignallerCallback> {
        None
    }
}
