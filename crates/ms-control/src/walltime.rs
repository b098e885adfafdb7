//! Wall-clock accounting for the run.

use std::time::{Duration, Instant};

use ms_core::Step;

/// Tracks wall-clock time of the run and of individual steps.
///
/// Counters can be reset mid-run (see [`ResetHandler`][crate::ResetHandler])
/// so that performance figures exclude start-up costs; the run start is
/// never reset.
#[derive(Debug)]
pub struct WallTimeAccounting {
    run_start:      Instant,
    counters_start: Instant,
    step_start:     Option<Instant>,
    step_time:      Duration,
    steps_done:     i64,
    steps_counted:  i64,
    reset_at:       Option<Step>,
    run_time:       Option<Duration>,
}

impl WallTimeAccounting {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            run_start:      now,
            counters_start: now,
            step_start:     None,
            step_time:      Duration::ZERO,
            steps_done:     0,
            steps_counted:  0,
            reset_at:       None,
            run_time:       None,
        }
    }

    pub fn start_step(&mut self) {
        self.step_start = Some(Instant::now());
    }

    pub fn end_step(&mut self) {
        if let Some(start) = self.step_start.take() {
            self.step_time += start.elapsed();
        }
        self.steps_done += 1;
        self.steps_counted += 1;
    }

    /// Restart the performance counters at `step`.
    pub fn reset_counters(&mut self, step: Step) {
        self.counters_start = Instant::now();
        self.step_time = Duration::ZERO;
        self.steps_counted = 0;
        self.reset_at = Some(step);
    }

    /// Freeze the run time.  Further calls keep the first value.
    pub fn end(&mut self) -> Duration {
        *self.run_time.get_or_insert_with(|| self.run_start.elapsed())
    }

    pub fn elapsed(&self) -> Duration {
        self.run_time.unwrap_or_else(|| self.run_start.elapsed())
    }

    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed().as_secs_f64() / 3600.0
    }

    /// Steps completed since the run started.
    pub fn steps_done(&self) -> i64 {
        self.steps_done
    }

    /// Steps completed since the last counter reset.
    pub fn steps_counted(&self) -> i64 {
        self.steps_counted
    }

    pub fn reset_at(&self) -> Option<Step> {
        self.reset_at
    }

    /// Mean wall time per step since the last counter reset.
    pub fn mean_step_time(&self) -> Option<Duration> {
        if self.steps_counted == 0 {
            return None;
        }
        Some(self.counters_start.elapsed().div_f64(self.steps_counted as f64))
    }

    /// Estimated wall time for `steps_left` more steps.
    pub fn remaining(&self, steps_left: i64) -> Option<Duration> {
        let per_step = self.mean_step_time()?;
        Some(per_step.mul_f64(steps_left.max(0) as f64))
    }

    /// Wall time spent inside steps (pre-step to post-step) since the last
    /// counter reset.
    pub fn step_time(&self) -> Duration {
        self.step_time
    }

    #[cfg(test)]
    pub(crate) fn set_steps_counted(&mut self, steps: i64) {
        self.steps_counted = steps;
    }
}

impl Default for WallTimeAccounting {
    fn default() -> Self {
        Self::start()
    }
}
