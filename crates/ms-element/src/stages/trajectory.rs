//! Trajectory output: frames, the sink trait, and the element driving it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ms_core::{Step, Time};
use ms_signal::{SignallerCallback, SignallerClient, TrajectoryEvent};
use serde::Serialize;
use tracing::info;

use crate::element::TrajectoryWriterCallback;
use crate::{ElementResult, Registrar, SimulatorElement};

/// Snapshot of the state on a state-writing step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateFrame {
    pub step:       Step,
    pub time:       Time,
    /// Written on the last step of the run (final configuration).
    pub is_final:   bool,
    pub box_diag:   [f64; 3],
    pub positions:  Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
}

/// Energies on an energy-writing step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnergyFrame {
    pub step:        Step,
    pub time:        Time,
    pub kinetic:     f64,
    pub potential:   f64,
    pub total:       f64,
    pub temperature: f64,
    pub pressure:    f64,
    pub lambda:      Option<f64>,
    pub dhdl:        f64,
}

/// Destination for trajectory frames.
pub trait TrajectorySink {
    fn write_state(&mut self, frame: &StateFrame) -> ElementResult<()>;

    fn write_energy(&mut self, frame: &EnergyFrame) -> ElementResult<()>;

    /// Called once at the end of the run.
    fn flush(&mut self) -> ElementResult<()> {
        Ok(())
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramesWritten {
    pub state:  usize,
    pub energy: usize,
}

struct TrajectoryWriter {
    sink:           Box<dyn TrajectorySink>,
    state_writers:  Vec<TrajectoryWriterCallback>,
    energy_writers: Vec<TrajectoryWriterCallback>,
    written:        FramesWritten,
}

/// Runs the writer callbacks of every writer client against the sink on
/// trajectory-writing steps.
///
/// Sits last in the call list so every other element has finished the
/// step before anything is written.
pub struct TrajectoryElement {
    writer:      Rc<RefCell<TrajectoryWriter>>,
    state_step:  Rc<Cell<Option<Step>>>,
    energy_step: Rc<Cell<Option<Step>>>,
}

impl TrajectoryElement {
    pub fn new(sink: Box<dyn TrajectorySink>) -> Self {
        Self {
            writer: Rc::new(RefCell::new(TrajectoryWriter {
                sink,
                state_writers: Vec::new(),
                energy_writers: Vec::new(),
                written: FramesWritten::default(),
            })),
            state_step: Rc::new(Cell::new(None)),
            energy_step: Rc::new(Cell::new(None)),
        }
    }

    /// Ask `client` for its writer callbacks.
    pub fn register_writer_client<C: SimulatorElement + ?Sized>(&mut self, client: &mut C) {
        let mut writer = self.writer.borrow_mut();
        for event in TrajectoryEvent::ALL {
            if let Some(callback) = client.register_trajectory_writer_callback(event) {
                match event {
                    TrajectoryEvent::StateWritingStep => writer.state_writers.push(callback),
                    TrajectoryEvent::EnergyWritingStep => writer.energy_writers.push(callback),
                }
            }
        }
    }

    pub fn frames_written(&self) -> FramesWritten {
        self.writer.borrow().written
    }
}

impl SignallerClient for TrajectoryElement {
    fn register_trajectory_signaller_callback(
        &mut self,
        event: TrajectoryEvent,
    ) -> Option<SignallerCallback> {
        let cell = match event {
            TrajectoryEvent::StateWritingStep => Rc::clone(&self.state_step),
            TrajectoryEvent::EnergyWritingStep => Rc::clone(&self.energy_step),
        };
        Some(Box::new(move |step, _time| cell.set(Some(step))))
    }
}

impl SimulatorElement for TrajectoryElement {
    fn name(&self) -> &'static str {
        "trajectory"
    }

    fn schedule_task(&mut self, step: Step, time: Time, registrar: &mut Registrar<'_>) {
        let write_state = self.state_step.get() == Some(step);
        let write_energy = self.energy_step.get() == Some(step);
        if !write_state && !write_energy {
            return;
        }
        let writer = Rc::clone(&self.writer);
        registrar.register(move || {
            let mut guard = writer.borrow_mut();
            let TrajectoryWriter { sink, state_writers, energy_writers, written } = &mut *guard;
            if write_state {
                for callback in state_writers.iter_mut() {
                    callback(sink.as_mut(), step, time)?;
                }
                written.state += 1;
            }
            if write_energy {
                for callback in energy_writers.iter_mut() {
                    callback(sink.as_mut(), step, time)?;
                }
                written.energy += 1;
            }
            Ok(())
        });
    }

    fn element_teardown(&mut self) -> ElementResult<()> {
        let mut writer = self.writer.borrow_mut();
        writer.sink.flush()?;
        info!(state = writer.written.state, energy = writer.written.energy, "trajectory frames written");
        Ok(())
    }
}
