//! Performance-counter resets.

use ms_core::Step;
use tracing::info;

use crate::WallTimeAccounting;

/// Decides when the performance counters are reset.
pub trait ResetMonitor {
    /// Evaluate wall-time based conditions; called from every pre-step.
    fn set_signal(&mut self, walltime: &WallTimeAccounting);

    /// Reset the counters if due.  Called from every post-step; returns
    /// whether a reset happened.
    fn reset_counters(
        &mut self,
        step:              Step,
        steps_since_start: i64,
        walltime:          &mut WallTimeAccounting,
    ) -> bool;
}

/// Resets the counters once, halfway through the run.
///
/// Halfway means half of `nsteps` for a finite run, or half of `max_hours`
/// when a wall-time budget is set, whichever comes first.
pub struct ResetHandler {
    enabled:   bool,
    nsteps:    i64,
    max_hours: Option<f64>,
    pending:   bool,
    done:      bool,
}

impl ResetHandler {
    pub fn new(reset_halfway: bool, nsteps: i64, max_hours: Option<f64>) -> Self {
        Self { enabled: reset_halfway, nsteps, max_hours, pending: false, done: false }
    }

    pub fn has_reset(&self) -> bool {
        self.done
    }
}

impl ResetMonitor for ResetHandler {
    fn set_signal(&mut self, walltime: &WallTimeAccounting) {
        if !self.enabled || self.done || self.pending {
            return;
        }
        if let Some(hours) = self.max_hours {
            self.pending = walltime.elapsed_hours() >= 0.5 * hours;
        }
    }

    fn reset_counters(
        &mut self,
        step:              Step,
        steps_since_start: i64,
        walltime:          &mut WallTimeAccounting,
    ) -> bool {
        if !self.enabled || self.done {
            return false;
        }
        let halfway = self.nsteps > 0 && steps_since_start == self.nsteps / 2;
        if !(halfway || self.pending) {
            return false;
        }
        walltime.reset_counters(step);
        self.done = true;
        self.pending = false;
        info!(%step, "performance counters reset");
        true
    }
}
