//! Trajectory-writing step detection.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::{Step, Time};

use crate::builder::callbacks_for;
use crate::{Signaller, SignallerCallback, SignallerClient, TrajectoryEvent};

/// Output intervals consulted by the [`TrajectorySignaller`].
#[derive(Copy, Clone, Debug, Default)]
pub struct TrajectoryIntervals {
    pub nstxout:       i64,
    pub nstvout:       i64,
    pub nstfout:       i64,
    pub nstenergy:     i64,
    /// Write the state on the last step even if no interval matches.
    pub write_confout: bool,
}

/// Fires [`TrajectoryEvent::StateWritingStep`] on position/velocity/force
/// output steps and [`TrajectoryEvent::EnergyWritingStep`] on energy output
/// steps.  Both also fire on the last step (state only with
/// `write_confout`).
pub struct TrajectorySignaller {
    state_callbacks:  Vec<SignallerCallback>,
    energy_callbacks: Vec<SignallerCallback>,
    intervals:        TrajectoryIntervals,
    last_step:        Rc<Cell<Step>>,
}

impl TrajectorySignaller {
    pub fn new(
        mut callbacks: Vec<(TrajectoryEvent, SignallerCallback)>,
        intervals:     TrajectoryIntervals,
    ) -> Self {
        let state_callbacks = callbacks_for(&mut callbacks, TrajectoryEvent::StateWritingStep);
        let energy_callbacks = callbacks_for(&mut callbacks, TrajectoryEvent::EnergyWritingStep);
        Self {
            state_callbacks,
            energy_callbacks,
            intervals,
            last_step: Rc::new(Cell::new(Step::MAX)),
        }
    }
}

impl SignallerClient for TrajectorySignaller {
    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        let last_step = Rc::clone(&self.last_step);
        Some(Box::new(move |step, _time| last_step.set(step)))
    }
}

impl Signaller for TrajectorySignaller {
    fn name(&self) -> &'static str {
        "trajectory"
    }

    fn signal(&mut self, step: Step, time: Time) {
        let iv = &self.intervals;
        let is_last_step = step == self.last_step.get();
        let write_state = step.is_multiple_of(iv.nstxout)
            || step.is_multiple_of(iv.nstvout)
            || step.is_multiple_of(iv.nstfout)
            || (is_last_step && iv.write_confout);
        let write_energy = step.is_multiple_of(iv.nstenergy) || is_last_step;

        if write_state {
            for callback in &mut self.state_callbacks {
                callback(step, time);
            }
        }
        if write_energy {
            for callback in &mut self.energy_callbacks {
                callback(step, time);
            }
        }
    }
}
