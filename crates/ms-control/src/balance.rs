//! Batch-level helpers: repartitioning and load balancing.
//!
//! Both run once per batch, at the start of batch generation, which is the
//! step right after a re-partition boundary.

use std::cell::Cell;
use std::rc::Rc;

use ms_core::{Step, Time};
use ms_element::stages::{SharedState, StatePropagatorData};
use ms_signal::{SignallerCallback, SignallerClient};
use tracing::debug;

use crate::ControlResult;

/// Work the scheduler runs once per batch.
pub trait BatchHelper {
    fn setup(&mut self) -> ControlResult<()> {
        Ok(())
    }

    fn run(&mut self, step: Step, time: Time) -> ControlResult<()>;

    fn teardown(&mut self) -> ControlResult<()> {
        Ok(())
    }

    /// Whether the helper is currently printing progress of its own; the
    /// scheduler suppresses its progress output meanwhile.
    fn is_printing(&self) -> bool {
        false
    }
}

// ── Repartitioning ────────────────────────────────────────────────────────────

/// Redistributes the system over cooperating processes.
pub trait Partitioner {
    fn partition(&mut self, step: Step, state: &mut StatePropagatorData) -> ControlResult<()>;
}

/// The two most recent distinct re-partition steps.
///
/// The first step of a batch is signalled before the batch helpers run, so
/// when that step is itself a re-partition step it has already replaced the
/// boundary the batch follows.
#[derive(Clone, Copy, Debug, Default)]
struct NsHistory {
    previous: Option<Step>,
    latest:   Option<Step>,
}

impl NsHistory {
    fn record(self, step: Step) -> Self {
        if self.latest == Some(step) {
            return self;
        }
        Self { previous: self.latest, latest: Some(step) }
    }

    fn precedes(self, step: Step) -> bool {
        [self.previous, self.latest]
            .into_iter()
            .flatten()
            .any(|ns| ns.next() == step)
    }
}

/// Calls the [`Partitioner`] at the start of every batch that follows a
/// re-partition step.  The initial partitioning happens in `setup`.
pub struct RepartitionHelper {
    partitioner:      Box<dyn Partitioner>,
    state:            SharedState,
    init_step:        Step,
    ns_steps:         Rc<Cell<NsHistory>>,
    last_partitioned: Option<Step>,
    partitions:       usize,
}

impl RepartitionHelper {
    pub fn new(partitioner: Box<dyn Partitioner>, state: SharedState, init_step: Step) -> Self {
        Self {
            partitioner,
            state,
            init_step,
            ns_steps: Rc::new(Cell::new(NsHistory::default())),
            last_partitioned: None,
            partitions: 0,
        }
    }

    /// Number of partitionings so far, including the initial one.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    fn partition(&mut self, step: Step) -> ControlResult<()> {
        self.partitioner.partition(step, &mut self.state.borrow_mut())?;
        self.last_partitioned = Some(step);
        self.partitions += 1;
        debug!(%step, "system repartitioned");
        Ok(())
    }
}

impl SignallerClient for RepartitionHelper {
    fn register_ns_callback(&mut self) -> Option<SignallerCallback> {
        let ns_steps = Rc::clone(&self.ns_steps);
        Some(Box::new(move |step, _time| ns_steps.set(ns_steps.get().record(step))))
    }
}

impl BatchHelper for RepartitionHelper {
    fn setup(&mut self) -> ControlResult<()> {
        self.partition(self.init_step)
    }

    fn run(&mut self, step: Step, _time: Time) -> ControlResult<()> {
        // A rewound batch may start on a step that was already handled.
        let done = step == self.init_step || self.last_partitioned == Some(step);
        if done || !self.ns_steps.get().precedes(step) {
            return Ok(());
        }
        self.partition(step)
    }
}

// ── Load balancing ────────────────────────────────────────────────────────────

/// External load balancer, e.g. for long-range electrostatics.
pub trait LoadBalancer {
    /// Whether balancing is still in progress.
    fn is_active(&self) -> bool;

    fn balance(&mut self, step: Step, time: Time) -> ControlResult<()>;

    fn is_printing(&self) -> bool {
        false
    }

    fn finish(&mut self) -> ControlResult<()> {
        Ok(())
    }
}

/// Runs the [`LoadBalancer`] once per batch while it reports itself active.
pub struct LoadBalanceHelper {
    balancer: Box<dyn LoadBalancer>,
    runs:     usize,
}

impl LoadBalanceHelper {
    pub fn new(balancer: Box<dyn LoadBalancer>) -> Self {
        Self { balancer, runs: 0 }
    }

    pub fn runs(&self) -> usize {
        self.runs
    }
}

impl SignallerClient for LoadBalanceHelper {}

impl BatchHelper for LoadBalanceHelper {
    fn run(&mut self, step: Step, time: Time) -> ControlResult<()> {
        if !self.balancer.is_active() {
            return Ok(());
        }
        self.runs += 1;
        self.balancer.balance(step, time)
    }

    fn teardown(&mut self) -> ControlResult<()> {
        self.balancer.finish()
    }

    fn is_printing(&self) -> bool {
        self.balancer.is_printing()
    }
}
