//! Microstate of the system and the element publishing it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ms_core::{AtomId, AtomRng, ElementId, Step, Time};
use ms_signal::{SignallerCallback, SignallerClient, TrajectoryEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::trajectory::{StateFrame, TrajectorySink};
use super::BOLTZMANN;
use crate::element::TrajectoryWriterCallback;
use crate::{
    element_handle, BuildContext, BuildElement, ElementError, ElementResult, Registrar,
    ServiceKind, SimulatorElement,
};

/// Positions, velocities, forces, and masses of every atom, plus a
/// rectangular box.  Indexed by [`AtomId`].
#[derive(Clone, Debug, PartialEq)]
pub struct StatePropagatorData {
    pub positions:  Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub forces:     Vec<[f64; 3]>,
    pub masses:     Vec<f64>,
    pub box_diag:   [f64; 3],
}

pub type SharedState = Rc<RefCell<StatePropagatorData>>;

impl StatePropagatorData {
    /// Atoms at rest.  `positions` and `masses` must have the same length.
    pub fn new(positions: Vec<[f64; 3]>, masses: Vec<f64>, box_diag: [f64; 3]) -> Self {
        debug_assert_eq!(positions.len(), masses.len());
        let n = positions.len();
        Self {
            positions,
            velocities: vec![[0.0; 3]; n],
            forces:     vec![[0.0; 3]; n],
            masses,
            box_diag,
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.positions.len()
    }

    pub fn volume(&self) -> f64 {
        self.box_diag.iter().product()
    }

    /// Degrees of freedom used for the temperature.
    pub fn degrees_of_freedom(&self) -> usize {
        3 * self.num_atoms()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, m)| 0.5 * m * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
            .sum()
    }

    /// Draw Maxwell–Boltzmann velocities at `temperature`.
    ///
    /// Every atom uses its own RNG stream, so the result does not depend on
    /// iteration order.
    pub fn generate_velocities(&mut self, temperature: f64, seed: u64) {
        for (i, (v, m)) in self.velocities.iter_mut().zip(&self.masses).enumerate() {
            let mut rng = AtomRng::new(seed, AtomId::from_index(i));
            let sigma = (BOLTZMANN * temperature / m).sqrt();
            *v = [sigma * rng.gaussian(), sigma * rng.gaussian(), sigma * rng.gaussian()];
        }
    }

    /// Scale the box and all positions by `mu` per axis.
    pub fn scale_box(&mut self, mu: [f64; 3]) {
        for (b, m) in self.box_diag.iter_mut().zip(mu) {
            *b *= m;
        }
        for x in &mut self.positions {
            for (c, m) in x.iter_mut().zip(mu) {
                *c *= m;
            }
        }
    }

    fn frame(&self, step: Step, time: Time, is_final: bool) -> StateFrame {
        StateFrame {
            step,
            time,
            is_final,
            box_diag: self.box_diag,
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
        }
    }
}

// ── Checkpoint payload ──

#[derive(Serialize, Deserialize)]
struct StateCheckpoint {
    positions:  Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
    box_diag:   [f64; 3],
}

// ── Element ───────────────────────────────────────────────────────────────────

/// Publishes the state: writes state frames on state-writing steps (marking
/// the one on the last step as final) and owns checkpointing of the state.
pub struct StateElement {
    state:     SharedState,
    last_step: Rc<Cell<Step>>,
}

impl StateElement {
    pub fn new(state: SharedState) -> Self {
        Self { state, last_step: Rc::new(Cell::new(Step::MAX)) }
    }

    /// Builder for the shared state element.  Adding it more than once
    /// yields the same element.
    pub fn builder() -> StateElementBuilder {
        StateElementBuilder
    }
}

impl SignallerClient for StateElement {
    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        let last_step = Rc::clone(&self.last_step);
        Some(Box::new(move |step, _time| last_step.set(step)))
    }
}

impl SimulatorElement for StateElement {
    fn name(&self) -> &'static str {
        "state"
    }

    fn schedule_task(&mut self, _step: Step, _time: Time, _registrar: &mut Registrar<'_>) {}

    fn checkpoint_key(&self) -> Option<&'static str> {
        Some("state")
    }

    fn write_checkpoint(&self) -> ElementResult<Value> {
        let state = self.state.borrow();
        Ok(serde_json::to_value(StateCheckpoint {
            positions:  state.positions.clone(),
            velocities: state.velocities.clone(),
            box_diag:   state.box_diag,
        })?)
    }

    fn restore_checkpoint(&mut self, data: &Value) -> ElementResult<()> {
        let saved = StateCheckpoint::deserialize(data)?;
        let mut state = self.state.borrow_mut();
        if saved.positions.len() != state.num_atoms() || saved.velocities.len() != state.num_atoms() {
            return Err(ElementError::Checkpoint {
                key:    "state",
                reason: format!(
                    "checkpoint has {} atoms, system has {}",
                    saved.positions.len(),
                    state.num_atoms()
                ),
            });
        }
        state.positions = saved.positions;
        state.velocities = saved.velocities;
        state.box_diag = saved.box_diag;
        Ok(())
    }

    fn register_trajectory_writer_callback(
        &mut self,
        event: TrajectoryEvent,
    ) -> Option<TrajectoryWriterCallback> {
        if event != TrajectoryEvent::StateWritingStep {
            return None;
        }
        let state = Rc::clone(&self.state);
        let last_step = Rc::clone(&self.last_step);
        Some(Box::new(move |sink: &mut dyn TrajectorySink, step: Step, time: Time| {
            let frame = state.borrow().frame(step, time, step == last_step.get());
            sink.write_state(&frame)
        }))
    }
}

pub struct StateElementBuilder;

impl BuildElement for StateElementBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let state = ctx.state();
        ctx.service(ServiceKind::StatePropagatorData, move || {
            Ok(element_handle(StateElement::new(state)))
        })
    }
}
