//! The scheduler: batch generation and the pull-based task interface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use ms_control::{BatchHelper, Checkpoint, PersistenceScheduler, ResetMonitor, WallTimeAccounting};
use ms_core::{ElementId, SimClock, Step, Time};
use ms_element::{ElementHandle, ElementStore, Registrar, Task, TaskKind};
use ms_signal::{SharedStopMonitor, Signaller};
use tracing::{debug, info, warn};

use crate::step_facts::StepFacts;
use crate::AlgorithmResult;

pub type SharedResetMonitor = Rc<RefCell<dyn ResetMonitor>>;
pub type SharedPersistence = Rc<RefCell<dyn PersistenceScheduler>>;
pub type SharedBatchHelper = Rc<RefCell<dyn BatchHelper>>;

/// Name under which the scheduler's own tasks are registered.
const SCHEDULER: &str = "scheduler";

/// What a finished [`SimulatorAlgorithm::run`] reports.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub tasks_run:  usize,
    pub steps_done: i64,
    pub last_step:  Step,
    pub wall_time:  Duration,
}

/// Owns every element and signaller of a run and hands out its tasks one
/// at a time.
///
/// Tasks are generated in batches.  A batch covers the steps from the
/// current step up to and including the next re-partition step (or the last
/// step).  For every step it holds a pre-step task, the tasks of every
/// element in call order, and a post-step task; the batch containing the
/// last step ends with a teardown task.
///
/// If a pre-step task finds that a stop was requested for a step that is
/// not the known last step, the rest of the batch is discarded and the next
/// batch starts again from that step, which the last-step signaller then
/// reports as the last one.
///
/// Constructed by [`SimulatorAlgorithmBuilder`][crate::SimulatorAlgorithmBuilder].
pub struct SimulatorAlgorithm {
    clock:        SimClock,
    init_step:    Step,
    step:         Step,
    verbose:      Option<i64>,
    tasks:        Vec<Task>,
    cursor:       usize,
    run_finished: bool,
    is_set_up:    bool,
    store:        ElementStore,
    call_list:    Vec<ElementId>,
    setup_list:   Vec<ElementId>,
    signallers:   Vec<Box<dyn Signaller>>,
    facts:        Rc<StepFacts>,
    stop:         SharedStopMonitor,
    reset:        Option<SharedResetMonitor>,
    persistence:  Option<SharedPersistence>,
    repartition:  Option<SharedBatchHelper>,
    load_balance: Option<SharedBatchHelper>,
    walltime:     Rc<RefCell<WallTimeAccounting>>,
    rewind:       Rc<Cell<Option<Step>>>,
    restart:      Option<Checkpoint>,
}

/// Everything the builder hands over.
pub(crate) struct AlgorithmParts {
    pub clock:        SimClock,
    pub init_step:    Step,
    pub verbose:      Option<i64>,
    pub store:        ElementStore,
    pub call_list:    Vec<ElementId>,
    pub setup_list:   Vec<ElementId>,
    pub signallers:   Vec<Box<dyn Signaller>>,
    pub facts:        Rc<StepFacts>,
    pub stop:         SharedStopMonitor,
    pub reset:        Option<SharedResetMonitor>,
    pub persistence:  Option<SharedPersistence>,
    pub repartition:  Option<SharedBatchHelper>,
    pub load_balance: Option<SharedBatchHelper>,
    pub restart:      Option<Checkpoint>,
}

impl SimulatorAlgorithm {
    pub(crate) fn from_parts(parts: AlgorithmParts) -> Self {
        Self {
            clock:        parts.clock,
            init_step:    parts.init_step,
            step:         parts.init_step,
            verbose:      parts.verbose,
            tasks:        Vec::new(),
            cursor:       0,
            run_finished: false,
            is_set_up:    false,
            store:        parts.store,
            call_list:    parts.call_list,
            setup_list:   parts.setup_list,
            signallers:   parts.signallers,
            facts:        parts.facts,
            stop:         parts.stop,
            reset:        parts.reset,
            persistence:  parts.persistence,
            repartition:  parts.repartition,
            load_balance: parts.load_balance,
            walltime:     Rc::new(RefCell::new(WallTimeAccounting::start())),
            rewind:       Rc::new(Cell::new(None)),
            restart:      parts.restart,
        }
    }

    // ── Lifecycle ──

    /// Set everything up, once, before the first batch: signallers, the
    /// repartition helper, checkpoint restore and element setup (in setup
    /// order), then the load balancer.
    pub(crate) fn setup(&mut self) -> AlgorithmResult<()> {
        debug_assert!(!self.is_set_up, "setup must run exactly once");
        for signaller in &mut self.signallers {
            signaller.setup()?;
        }
        if let Some(repartition) = &self.repartition {
            repartition.borrow_mut().setup()?;
        }
        if let Some(checkpoint) = self.restart.take() {
            self.restore(&checkpoint)?;
        }
        for id in &self.setup_list {
            if let Some(element) = self.store.get(*id) {
                element.borrow_mut().element_setup()?;
            }
        }
        if let Some(load_balance) = &self.load_balance {
            load_balance.borrow_mut().setup()?;
        }
        *self.walltime.borrow_mut() = WallTimeAccounting::start();
        self.is_set_up = true;
        info!(
            init_step = %self.init_step,
            elements = self.setup_list.len(),
            signallers = self.signallers.len(),
            "simulator algorithm set up"
        );
        Ok(())
    }

    fn restore(&mut self, checkpoint: &Checkpoint) -> AlgorithmResult<()> {
        for id in &self.setup_list {
            let Some(element) = self.store.get(*id) else { continue };
            let mut element = element.borrow_mut();
            let Some(key) = element.checkpoint_key() else { continue };
            match checkpoint.get(key) {
                Some(data) => element.restore_checkpoint(data)?,
                None => warn!(key, "checkpoint has no data for element, keeping initial state"),
            }
        }
        info!(step = %checkpoint.step, "state restored from checkpoint");
        Ok(())
    }

    /// The next task to run, or `None` once the run is over.
    ///
    /// Regenerates the batch when the previous one is exhausted or was
    /// discarded by a stop request.  Once `None` is returned, every further
    /// call returns `None`.
    pub fn next_task(&mut self) -> AlgorithmResult<Option<&mut Task>> {
        debug_assert!(self.is_set_up, "next_task called before setup");
        if let Some(step) = self.rewind.take() {
            debug!(
                %step,
                discarded = self.tasks.len() - self.cursor,
                "stop requested, rewinding batch"
            );
            self.step = step;
            self.populate()?;
        } else if self.cursor >= self.tasks.len() {
            if self.run_finished {
                self.tasks.clear();
                self.cursor = 0;
                return Ok(None);
            }
            self.populate()?;
        }
        let index = self.cursor;
        self.cursor += 1;
        Ok(self.tasks.get_mut(index))
    }

    /// Pull and run tasks until the run is over.
    pub fn run(&mut self) -> AlgorithmResult<RunSummary> {
        let mut tasks_run = 0;
        while let Some(task) = self.next_task()? {
            task.run()?;
            tasks_run += 1;
        }
        let walltime = self.walltime.borrow();
        Ok(RunSummary {
            tasks_run,
            steps_done: walltime.steps_done(),
            last_step: self.facts.last_step(),
            wall_time: walltime.elapsed(),
        })
    }

    // ── Batch generation ──

    fn populate(&mut self) -> AlgorithmResult<()> {
        self.tasks.clear();
        self.cursor = 0;

        let first = self.step;
        let mut time = self.clock.time_at(self.step);
        self.signal_all(self.step, time);

        if let Some(persistence) = &self.persistence {
            persistence.borrow_mut().maybe_persist(self.step, time)?;
        }
        if let Some(load_balance) = &self.load_balance {
            load_balance.borrow_mut().run(self.step, time)?;
        }
        if let Some(repartition) = &self.repartition {
            repartition.borrow_mut().run(self.step, time)?;
        }

        loop {
            let step = self.step;
            let is_ns_step = step == self.facts.next_ns_step();

            let pre_step = self.pre_step_task(step, is_ns_step);
            self.tasks.push(pre_step);
            for id in &self.call_list {
                let Some(element) = self.store.get(*id) else { continue };
                let mut element = element.borrow_mut();
                let mut registrar = Registrar::new(&mut self.tasks, step, element.name());
                element.schedule_task(step, time, &mut registrar);
            }
            let post_step = self.post_step_task(step, time);
            self.tasks.push(post_step);

            self.step = step.next();
            time = self.clock.time_at(self.step);
            self.signal_all(self.step, time);

            if is_ns_step || self.step > self.facts.last_step() {
                break;
            }
        }

        self.run_finished = self.step > self.facts.last_step();
        if self.run_finished {
            let teardown = self.teardown_task();
            self.tasks.push(teardown);
        }
        debug!(
            first = %first,
            last = %Step(self.step.0 - 1),
            tasks = self.tasks.len(),
            finished = self.run_finished,
            "batch generated"
        );
        Ok(())
    }

    fn signal_all(&mut self, step: Step, time: Time) {
        for signaller in &mut self.signallers {
            signaller.signal(step, time);
        }
    }

    fn pre_step_task(&self, step: Step, is_ns_step: bool) -> Task {
        let stop = Rc::clone(&self.stop);
        let facts = Rc::clone(&self.facts);
        let rewind = Rc::clone(&self.rewind);
        let reset = self.reset.clone();
        let walltime = Rc::clone(&self.walltime);
        Task::new(step, TaskKind::PreStep, SCHEDULER, move || {
            // A stop may have been requested after this batch was built.
            if stop.borrow().stopping_after_current_step(step, is_ns_step) && step != facts.last_step() {
                rewind.set(Some(step));
                return Ok(());
            }
            if let Some(reset) = &reset {
                reset.borrow_mut().set_signal(&walltime.borrow());
            }
            stop.borrow_mut().set_signal(step, is_ns_step);
            walltime.borrow_mut().start_step();
            Ok(())
        })
    }

    fn post_step_task(&self, step: Step, time: Time) -> Task {
        let facts = Rc::clone(&self.facts);
        let reset = self.reset.clone();
        let walltime = Rc::clone(&self.walltime);
        let load_balance = self.load_balance.clone();
        let verbose = self.verbose;
        let init_step = self.init_step;
        Task::new(step, TaskKind::PostStep, SCHEDULER, move || {
            let last_step = facts.last_step();
            let print = verbose.is_some_and(|interval| {
                step.is_multiple_of(interval) || step == init_step || step == last_step
            });
            let balancer_printing = load_balance.as_ref().is_some_and(|lb| lb.borrow().is_printing());
            if print && !balancer_printing {
                let walltime = walltime.borrow();
                let remaining = (last_step != Step::MAX)
                    .then(|| walltime.remaining(last_step - step))
                    .flatten();
                info!(%step, time, remaining = ?remaining, "step");
            }
            walltime.borrow_mut().end_step();
            if let Some(reset) = &reset {
                reset
                    .borrow_mut()
                    .reset_counters(step, step - init_step, &mut walltime.borrow_mut());
            }
            Ok(())
        })
    }

    fn teardown_task(&self) -> Task {
        let elements: Vec<ElementHandle> = self
            .setup_list
            .iter()
            .filter_map(|id| self.store.get(*id).cloned())
            .collect();
        let load_balance = self.load_balance.clone();
        let walltime = Rc::clone(&self.walltime);
        let last_step = self.facts.last_step();
        Task::new(last_step, TaskKind::Teardown, SCHEDULER, move || {
            for element in &elements {
                element.borrow_mut().element_teardown()?;
            }
            if let Some(load_balance) = &load_balance {
                load_balance.borrow_mut().teardown()?;
            }
            let mut walltime = walltime.borrow_mut();
            let elapsed = walltime.end();
            info!(
                steps = walltime.steps_done(),
                last_step = %last_step,
                elapsed = ?elapsed,
                "run finished"
            );
            Ok(())
        })
    }

    // ── Accessors ──

    /// The step the next batch will start from.
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn last_step(&self) -> Step {
        self.facts.last_step()
    }

    pub fn is_finished(&self) -> bool {
        self.run_finished && self.cursor >= self.tasks.len()
    }

    pub fn element(&self, id: ElementId) -> Option<&ElementHandle> {
        self.store.get(id)
    }

    /// Element ids in invocation order.
    pub fn call_list(&self) -> &[ElementId] {
        &self.call_list
    }

    pub fn walltime(&self) -> Rc<RefCell<WallTimeAccounting>> {
        Rc::clone(&self.walltime)
    }
}
