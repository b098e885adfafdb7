//! Last-step detection.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::{Step, Time};
use tracing::debug;

use crate::{
    SharedStopMonitor, SignalError, SignalResult, Signaller, SignallerCallback, SignallerClient,
};

/// Fires once on the last step of the run.
///
/// The last step is either the configured stop step (`init_step + nsteps`)
/// or the first step after which the stop monitor asks to stop.  The
/// signaller needs to know whether a step is a re-partition step to ask the
/// monitor, so it must be registered as a neighbor-search client before
/// [`setup`][Signaller::setup].
///
/// If the scheduler rewinds to a step before the last step already
/// signalled, the signaller evaluates again and may announce an earlier
/// last step.
pub struct LastStepSignaller {
    callbacks:      Vec<SignallerCallback>,
    stop_step:      Step,
    stop_monitor:   SharedStopMonitor,
    next_ns_step:   Rc<Cell<Option<Step>>>,
    ns_registered:  bool,
    signalled_step: Option<Step>,
}

impl LastStepSignaller {
    /// `nsteps == -1` means the configured stop step is never reached and
    /// only the stop monitor can end the run.
    pub fn new(
        callbacks:    Vec<SignallerCallback>,
        nsteps:       i64,
        init_step:    Step,
        stop_monitor: SharedStopMonitor,
    ) -> Self {
        let stop_step = if nsteps < 0 { Step::MAX } else { init_step + nsteps };
        Self {
            callbacks,
            stop_step,
            stop_monitor,
            next_ns_step: Rc::new(Cell::new(None)),
            ns_registered: false,
            signalled_step: None,
        }
    }

    /// The last step announced so far, if any.
    pub fn signalled_step(&self) -> Option<Step> {
        self.signalled_step
    }
}

impl SignallerClient for LastStepSignaller {
    fn register_ns_callback(&mut self) -> Option<SignallerCallback> {
        self.ns_registered = true;
        let next_ns_step = Rc::clone(&self.next_ns_step);
        Some(Box::new(move |step, _time| next_ns_step.set(Some(step))))
    }
}

impl Signaller for LastStepSignaller {
    fn name(&self) -> &'static str {
        "last step"
    }

    fn setup(&mut self) -> SignalResult<()> {
        if !self.ns_registered {
            return Err(SignalError::MissingRegistration {
                signaller:  "last step",
                dependency: "neighbor search",
            });
        }
        Ok(())
    }

    fn signal(&mut self, step: Step, time: Time) {
        if self.signalled_step.is_some_and(|last| step >= last) {
            return;
        }
        let is_ns_step = self.next_ns_step.get() == Some(step);
        let is_last_step = step == self.stop_step
            || self.stop_monitor.borrow().stopping_after_current_step(step, is_ns_step);
        if is_last_step {
            debug!(%step, "last step signalled");
            for callback in &mut self.callbacks {
                callback(step, time);
            }
            self.signalled_step = Some(step);
        }
    }
}
