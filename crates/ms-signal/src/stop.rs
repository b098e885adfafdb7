//! `StopMonitor`: the stop collaborator consulted per step.

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::Step;

/// Decides whether the run must end after the current step.
///
/// The answer may change asynchronously (an OS signal, a wall-time budget
/// running out), which is why the scheduler asks again in every pre-step
/// task instead of trusting what it knew when the batch was built.
pub trait StopMonitor {
    /// Whether the run should stop after `step`.
    fn stopping_after_current_step(&self, step: Step, is_ns_step: bool) -> bool;

    /// Evaluate the stop conditions for `step` so they take effect on a
    /// later step.
    fn set_signal(&mut self, step: Step, is_ns_step: bool);
}

/// Shared handle: the scheduler and the last-step signaller consult the same
/// monitor.
pub type SharedStopMonitor = Rc<RefCell<dyn StopMonitor>>;

/// A monitor that never requests a stop.
#[derive(Debug, Default)]
pub struct NeverStop;

impl StopMonitor for NeverStop {
    fn stopping_after_current_step(&self, _step: Step, _is_ns_step: bool) -> bool {
        false
    }

    fn set_signal(&mut self, _step: Step, _is_ns_step: bool) {}
}
