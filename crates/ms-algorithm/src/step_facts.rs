//! The facts the scheduler itself needs about upcoming steps.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::Step;
use ms_signal::{SignallerCallback, SignallerClient};

/// Most recently signalled last step and re-partition step.
///
/// Written only by signaller callbacks (through [`SignalHelper`]), read by
/// the batch loop and its pre-/post-step tasks.
#[derive(Debug)]
pub struct StepFacts {
    last_step:    Cell<Step>,
    next_ns_step: Cell<Step>,
}

impl StepFacts {
    pub fn new() -> Self {
        Self { last_step: Cell::new(Step::MAX), next_ns_step: Cell::new(Step::MAX) }
    }

    /// `Step::MAX` until the last step is known.
    pub fn last_step(&self) -> Step {
        self.last_step.get()
    }

    pub fn next_ns_step(&self) -> Step {
        self.next_ns_step.get()
    }
}

impl Default for StepFacts {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers the scheduler as a client of the neighbor-search and
/// last-step signallers.
pub struct SignalHelper {
    facts: Rc<StepFacts>,
}

impl SignalHelper {
    pub fn new(facts: Rc<StepFacts>) -> Self {
        Self { facts }
    }
}

impl SignallerClient for SignalHelper {
    fn register_ns_callback(&mut self) -> Option<SignallerCallback> {
        let facts = Rc::clone(&self.facts);
        Some(Box::new(move |step, _time| facts.next_ns_step.set(step)))
    }

    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        let facts = Rc::clone(&self.facts);
        Some(Box::new(move |step, _time| facts.last_step.set(step)))
    }
}
