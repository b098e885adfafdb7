//! Logging step detection.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::{Step, Time};

use crate::{Signaller, SignallerCallback, SignallerClient};

/// Fires every `nstlog` steps, on the initial step, and on the last step.
pub struct LoggingSignaller {
    callbacks: Vec<SignallerCallback>,
    nstlog:    i64,
    init_step: Step,
    last_step: Rc<Cell<Step>>,
}

impl LoggingSignaller {
    pub fn new(callbacks: Vec<SignallerCallback>, nstlog: i64, init_step: Step) -> Self {
        Self {
            callbacks,
            nstlog,
            init_step,
            last_step: Rc::new(Cell::new(Step::MAX)),
        }
    }
}

impl SignallerClient for LoggingSignaller {
    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        let last_step = Rc::clone(&self.last_step);
        Some(Box::new(move |step, _time| last_step.set(step)))
    }
}

impl Signaller for LoggingSignaller {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn signal(&mut self, step: Step, time: Time) {
        if step.is_multiple_of(self.nstlog) || step == self.init_step || step == self.last_step.get() {
            for callback in &mut self.callbacks {
                callback(step, time);
            }
        }
    }
}
