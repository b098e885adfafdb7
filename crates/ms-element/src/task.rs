//! Deferred tasks and the registrar elements schedule them through.

use std::fmt;

use ms_core::Step;

use crate::ElementResult;

/// Which part of a step a task belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TaskKind {
    /// Stop check and per-step bookkeeping, first task of every step.
    PreStep,
    /// Work contributed by an element.
    Element,
    /// Progress output and counters, last task of every step.
    PostStep,
    /// End-of-run teardown, only in the final batch.
    Teardown,
}

/// The deferred action itself.  It owns only the handles it captured.
pub type TaskFn = Box<dyn FnMut() -> ElementResult<()>>;

/// One deferred unit of work, bound to a step.
pub struct Task {
    step:  Step,
    kind:  TaskKind,
    owner: &'static str,
    run:   TaskFn,
}

impl Task {
    pub fn new(
        step:  Step,
        kind:  TaskKind,
        owner: &'static str,
        run:   impl FnMut() -> ElementResult<()> + 'static,
    ) -> Self {
        Self { step, kind, owner, run: Box::new(run) }
    }

    /// Execute the task.  The scheduler never calls this itself; the
    /// driver does.
    pub fn run(&mut self) -> ElementResult<()> {
        (self.run)()
    }

    #[inline]
    pub fn step(&self) -> Step {
        self.step
    }

    #[inline]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Name of the element (or scheduler part) that registered the task.
    #[inline]
    pub fn owner(&self) -> &'static str {
        self.owner
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("step", &self.step)
            .field("kind", &self.kind)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

// ── Registrar ─────────────────────────────────────────────────────────────────

/// Handed to [`SimulatorElement::schedule_task`][crate::SimulatorElement::schedule_task]:
/// appends element tasks for one step to the batch being built.
pub struct Registrar<'a> {
    tasks: &'a mut Vec<Task>,
    step:  Step,
    owner: &'static str,
}

impl<'a> Registrar<'a> {
    pub fn new(tasks: &'a mut Vec<Task>, step: Step, owner: &'static str) -> Self {
        Self { tasks, step, owner }
    }

    /// Append a task for the current step.
    pub fn register(&mut self, run: impl FnMut() -> ElementResult<()> + 'static) {
        self.tasks.push(Task::new(self.step, TaskKind::Element, self.owner, run));
    }

    #[inline]
    pub fn step(&self) -> Step {
        self.step
    }
}
