//! Re-partition (neighbor-search) step detection.

use ms_core::{Step, Time};

use crate::{Signaller, SignallerCallback};

/// Fires on every `nstlist`-th step and always on the initial step.
///
/// This is the first signaller in call order: everything else, including
/// the scheduler's batch boundary, depends on knowing the next
/// re-partition step.
pub struct NeighborSearchSignaller {
    callbacks: Vec<SignallerCallback>,
    nstlist:   i64,
    init_step: Step,
}

impl NeighborSearchSignaller {
    pub fn new(callbacks: Vec<SignallerCallback>, nstlist: i64, init_step: Step) -> Self {
        Self { callbacks, nstlist, init_step }
    }

    /// Whether `step` is a re-partition step under this signaller's rule.
    pub fn is_ns_step(&self, step: Step) -> bool {
        step.is_multiple_of(self.nstlist) || step == self.init_step
    }
}

impl Signaller for NeighborSearchSignaller {
    fn name(&self) -> &'static str {
        "neighbor search"
    }

    fn signal(&mut self, step: Step, time: Time) {
        if self.is_ns_step(step) {
            for callback in &mut self.callbacks {
                callback(step, time);
            }
        }
    }
}
