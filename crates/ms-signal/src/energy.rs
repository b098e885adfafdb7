//! Energy, virial, and free-energy calculation step detection.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::{Step, Time};

use crate::builder::callbacks_for;
use crate::{EnergySignallerEvent, Signaller, SignallerCallback, SignallerClient, TrajectoryEvent};

/// Fires calculation events on their own intervals, and additionally
/// whenever the energies are about to be written or logged.
///
/// Must be called after the trajectory and logging signallers, whose steps
/// it listens to.
pub struct EnergySignaller {
    energy_callbacks:      Vec<SignallerCallback>,
    virial_callbacks:      Vec<SignallerCallback>,
    free_energy_callbacks: Vec<SignallerCallback>,
    nstcalcenergy:         i64,
    nstpcouple:            i64,
    nstdhdl:               i64,
    energy_writing_step:   Rc<Cell<Option<Step>>>,
    logging_step:          Rc<Cell<Option<Step>>>,
}

impl EnergySignaller {
    pub fn new(
        mut callbacks: Vec<(EnergySignallerEvent, SignallerCallback)>,
        nstcalcenergy: i64,
        nstpcouple:    i64,
        nstdhdl:       i64,
    ) -> Self {
        use EnergySignallerEvent::*;
        Self {
            energy_callbacks: callbacks_for(&mut callbacks, EnergyCalculationStep),
            virial_callbacks: callbacks_for(&mut callbacks, VirialCalculationStep),
            free_energy_callbacks: callbacks_for(&mut callbacks, FreeEnergyCalculationStep),
            nstcalcenergy,
            nstpcouple,
            nstdhdl,
            energy_writing_step: Rc::new(Cell::new(None)),
            logging_step: Rc::new(Cell::new(None)),
        }
    }
}

impl SignallerClient for EnergySignaller {
    fn register_trajectory_signaller_callback(
        &mut self,
        event: TrajectoryEvent,
    ) -> Option<SignallerCallback> {
        if event != TrajectoryEvent::EnergyWritingStep {
            return None;
        }
        let energy_writing_step = Rc::clone(&self.energy_writing_step);
        Some(Box::new(move |step, _time| energy_writing_step.set(Some(step))))
    }

    fn register_logging_callback(&mut self) -> Option<SignallerCallback> {
        let logging_step = Rc::clone(&self.logging_step);
        Some(Box::new(move |step, _time| logging_step.set(Some(step))))
    }
}

impl Signaller for EnergySignaller {
    fn name(&self) -> &'static str {
        "energy"
    }

    fn signal(&mut self, step: Step, time: Time) {
        let write_energy = self.energy_writing_step.get() == Some(step);
        let log_energy = self.logging_step.get() == Some(step);

        let calculate_energy = step.is_multiple_of(self.nstcalcenergy) || write_energy || log_energy;
        let calculate_virial = step.is_multiple_of(self.nstpcouple) || write_energy || log_energy;
        let calculate_free_energy = step.is_multiple_of(self.nstdhdl) || write_energy;

        if calculate_energy {
            for callback in &mut self.energy_callbacks {
                callback(step, time);
            }
        }
        if calculate_virial {
            for callback in &mut self.virial_callbacks {
                callback(step, time);
            }
        }
        if calculate_free_energy {
            for callback in &mut self.free_energy_callbacks {
                callback(step, time);
            }
        }
    }
}
