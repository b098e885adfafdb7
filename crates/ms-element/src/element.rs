//! The `SimulatorElement` trait and its shared handle.

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::{Step, Time};
use ms_signal::{SignallerClient, TrajectoryEvent};
use serde_json::Value;

use crate::stages::TrajectorySink;
use crate::{ElementResult, Registrar};

/// Writer callback run by the trajectory element on state- or
/// energy-writing steps.
pub type TrajectoryWriterCallback =
    Box<dyn FnMut(&mut dyn TrajectorySink, Step, Time) -> ElementResult<()>>;

/// A stage of the simulation.
///
/// Lifecycle: constructed → `element_setup()` once → `schedule_task()` for
/// every step of every batch → `element_teardown()` once at the end of the
/// run.  `schedule_task` only decides *what* to do for a step; the work
/// itself goes into tasks that run later, so anything a task needs must be
/// captured by value or through a shared handle.
///
/// Every signaller hook of [`SignallerClient`] is available to an element
/// and defaults to "not interested".  The checkpoint and trajectory hooks
/// below work the same way.
pub trait SimulatorElement: SignallerClient {
    fn name(&self) -> &'static str;

    /// Register the tasks for `step` (time `time`), if any.
    fn schedule_task(&mut self, step: Step, time: Time, registrar: &mut Registrar<'_>);

    fn element_setup(&mut self) -> ElementResult<()> {
        Ok(())
    }

    fn element_teardown(&mut self) -> ElementResult<()> {
        Ok(())
    }

    // ── Checkpoint client ──

    /// Key under which this element's data is stored in a checkpoint.
    /// `None` means the element keeps no checkpointed state.
    fn checkpoint_key(&self) -> Option<&'static str> {
        None
    }

    fn write_checkpoint(&self) -> ElementResult<Value> {
        Ok(Value::Null)
    }

    /// Restore from data previously produced by `write_checkpoint`.  Called
    /// before `element_setup`.
    fn restore_checkpoint(&mut self, _data: &Value) -> ElementResult<()> {
        Ok(())
    }

    // ── Trajectory writer client ──

    fn register_trajectory_writer_callback(
        &mut self,
        _event: TrajectoryEvent,
    ) -> Option<TrajectoryWriterCallback> {
        None
    }
}

/// Shared handle to a stored element.  The scheduler holds one in its
/// ownership store; helpers that must reach a specific element (checkpoint
/// clients) hold clones.
pub type ElementHandle = Rc<RefCell<dyn SimulatorElement>>;

/// Wrap a concrete element in an [`ElementHandle`].
pub fn element_handle<E: SimulatorElement + 'static>(element: E) -> ElementHandle {
    Rc::new(RefCell::new(element))
}
