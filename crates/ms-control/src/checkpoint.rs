//! Checkpointing: when to write, what to collect, and where it goes.
//!
//! A [`CheckpointHandler`] decides on which steps a checkpoint is due.  The
//! [`CheckpointHelper`] is both the scheduler's persistence hook (asked
//! once per batch) and the first element of the call list, so it can
//! write the final checkpoint at the start of the last step.  It collects
//! data from every element with a checkpoint key into a [`Checkpoint`] and
//! hands it to a [`CheckpointWriter`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use ms_core::{Step, Time};
use ms_element::{ElementHandle, ElementResult, Registrar, SimulatorElement};
use ms_signal::{SignallerCallback, SignallerClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{ControlError, ControlResult};

/// Invoked by the scheduler once per batch, after the signallers have seen
/// the batch's first step.
pub trait PersistenceScheduler {
    fn maybe_persist(&mut self, step: Step, time: Time) -> ControlResult<()>;
}

// ── Checkpoint data ───────────────────────────────────────────────────────────

/// Everything needed to continue a run.
///
/// `step` is the first step the continued run executes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step:     Step,
    pub time:     Time,
    pub elements: BTreeMap<String, Value>,
}

impl Checkpoint {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.elements.get(key)
    }
}

pub trait CheckpointWriter {
    fn write(&mut self, checkpoint: &Checkpoint) -> ControlResult<()>;
}

/// Writes checkpoints as JSON.
///
/// Each write goes to a temporary file next to the target, which is then
/// renamed over it, so a crash mid-write leaves the previous checkpoint
/// intact.
#[derive(Clone, Debug)]
pub struct JsonCheckpointWriter {
    path: PathBuf,
}

impl JsonCheckpointWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(path: impl AsRef<Path>) -> ControlResult<Checkpoint> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ControlError::Io { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointWriter for JsonCheckpointWriter {
    fn write(&mut self, checkpoint: &Checkpoint) -> ControlResult<()> {
        let tmp = self.temp_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ControlError::Io { path, source }
        };
        let file = File::create(&tmp).map_err(io_err(&tmp))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, checkpoint)?;
        writer.flush().map_err(io_err(&tmp))?;
        writer.get_ref().sync_all().map_err(io_err(&tmp))?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        Ok(())
    }
}

// ── Handler ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
enum Period {
    EveryBoundary,
    Every(Duration),
    Never,
}

/// Decides on which steps a checkpoint is written.
///
/// - period `0`: at every re-partition boundary;
/// - period `> 0` minutes: at the first boundary after the period elapsed;
/// - period `< 0`: never periodically.
///
/// With `write_final` a checkpoint is always written on the last step.
/// Never on the first step of the run.
#[derive(Debug)]
pub struct CheckpointHandler {
    period:      Period,
    write_final: bool,
    last_write:  Instant,
    pending:     bool,
}

impl CheckpointHandler {
    pub fn new(period_minutes: f64, write_final: bool) -> Self {
        let period = if period_minutes == 0.0 {
            Period::EveryBoundary
        } else if period_minutes > 0.0 {
            Period::Every(Duration::from_secs_f64(period_minutes * 60.0))
        } else {
            Period::Never
        };
        Self { period, write_final, last_write: Instant::now(), pending: false }
    }

    pub fn writes_final(&self) -> bool {
        self.write_final
    }

    /// Arm a periodic checkpoint once the period has elapsed.
    pub fn set_signal(&mut self) {
        if let Period::Every(period) = self.period {
            if self.last_write.elapsed() >= period {
                self.pending = true;
            }
        }
    }

    /// Whether to checkpoint on this step.  Clears the pending signal when
    /// it answers yes.
    pub fn decide(&mut self, is_ns_step: bool, is_first_step: bool, is_last_step: bool) -> bool {
        if is_first_step {
            return false;
        }
        let periodic = match self.period {
            Period::EveryBoundary => is_ns_step,
            Period::Every(_) => is_ns_step && self.pending,
            Period::Never => false,
        };
        let write = periodic || (is_last_step && self.write_final);
        if write {
            self.pending = false;
            self.last_write = Instant::now();
        }
        write
    }
}

// ── Helper ────────────────────────────────────────────────────────────────────

struct HelperState {
    handler: CheckpointHandler,
    writer:  Box<dyn CheckpointWriter>,
    clients: Vec<ElementHandle>,
    written: usize,
}

impl HelperState {
    fn write(&mut self, step: Step, time: Time) -> ControlResult<()> {
        let mut elements = BTreeMap::new();
        for client in &self.clients {
            let client = client.borrow();
            if let Some(key) = client.checkpoint_key() {
                elements.insert(key.to_string(), client.write_checkpoint()?);
            }
        }
        self.writer.write(&Checkpoint { step, time, elements })?;
        self.written += 1;
        info!(%step, clients = self.clients.len(), "checkpoint written");
        Ok(())
    }
}

pub struct CheckpointHelper {
    state:     Rc<RefCell<HelperState>>,
    init_step: Step,
    last_step: Rc<Cell<Step>>,
}

impl CheckpointHelper {
    /// `clients` are the elements whose data goes into each checkpoint.
    pub fn new(
        handler:   CheckpointHandler,
        writer:    Box<dyn CheckpointWriter>,
        clients:   Vec<ElementHandle>,
        init_step: Step,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(HelperState { handler, writer, clients, written: 0 })),
            init_step,
            last_step: Rc::new(Cell::new(Step::MAX)),
        }
    }

    pub fn checkpoints_written(&self) -> usize {
        self.state.borrow().written
    }
}

impl PersistenceScheduler for CheckpointHelper {
    fn maybe_persist(&mut self, step: Step, time: Time) -> ControlResult<()> {
        let mut state = self.state.borrow_mut();
        // The last step has its own task; see `schedule_task`.
        if step != self.last_step.get() && state.handler.decide(true, step == self.init_step, false) {
            state.write(step, time)?;
        }
        state.handler.set_signal();
        Ok(())
    }
}

impl SignallerClient for CheckpointHelper {
    fn register_last_step_callback(&mut self) -> Option<SignallerCallback> {
        let last_step = Rc::clone(&self.last_step);
        Some(Box::new(move |step, _time| last_step.set(step)))
    }
}

impl SimulatorElement for CheckpointHelper {
    fn name(&self) -> &'static str {
        "checkpoint helper"
    }

    fn schedule_task(&mut self, step: Step, time: Time, registrar: &mut Registrar<'_>) {
        if step != self.last_step.get() || step == self.init_step {
            return;
        }
        if !self.state.borrow().handler.writes_final() {
            return;
        }
        debug!(%step, "scheduling final checkpoint");
        let state = Rc::clone(&self.state);
        registrar.register(move || -> ElementResult<()> {
            let mut state = state.borrow_mut();
            if state.handler.decide(false, false, true) {
                state.write(step, time)?;
            }
            Ok(())
        });
    }
}
