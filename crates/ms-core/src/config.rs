//! Run configuration.
//!
//! `RunConfig` carries every interval and switch the scheduler, the
//! signallers, and the orchestration helpers consult.  It is typically
//! deserialized by the application crate (with the `serde` feature) and
//! passed to the algorithm builder.  All `nst*` intervals are in steps; an
//! interval of zero disables the corresponding event.

use crate::{CoreError, CoreResult, SimClock, Step, Time};

/// Top-level run configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// First step of the run.  Non-zero when continuing from a checkpoint.
    pub init_step: i64,

    /// Number of steps after `init_step`.  `-1` runs until a stop is
    /// requested.  The run covers `init_step..=init_step + nsteps`.
    pub nsteps: i64,

    /// Time at step zero.
    pub init_time: Time,

    /// Time increment per step.
    pub delta_t: Time,

    /// Re-partition (neighbor-search) interval.  Zero means only the initial
    /// step is a re-partition step.
    pub nstlist: i64,

    /// Energy calculation interval.
    pub nstcalcenergy: i64,

    /// Energy output interval.
    pub nstenergy: i64,

    /// Log output interval.
    pub nstlog: i64,

    /// Position, velocity, and force output intervals.
    pub nstxout: i64,
    pub nstvout: i64,
    pub nstfout: i64,

    /// Free-energy (dH/dλ) calculation interval.
    pub nstdhdl: i64,

    /// Pressure- and temperature-coupling intervals.
    pub nstpcouple: i64,
    pub nsttcouple: i64,

    /// Enable the free-energy perturbation element.
    pub free_energy: bool,
    pub init_lambda: f64,
    pub delta_lambda: f64,

    /// Print progress to the log on verbose steps.
    pub verbose: bool,
    pub verbose_step_print_interval: i64,

    /// Write the final configuration on the last step.
    pub write_confout: bool,

    /// Wall-clock checkpoint period in minutes.  `0` checkpoints at every
    /// re-partition step, negative disables periodic checkpoints.
    pub checkpoint_period_minutes: f64,

    /// Always checkpoint on the last step.
    pub write_final_checkpoint: bool,

    /// Stop the run (at the next re-partition step) after this many hours.
    pub max_hours: Option<f64>,

    /// Reset performance counters halfway through the run.
    pub reset_halfway: bool,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            init_step:                   0,
            nsteps:                      0,
            init_time:                   0.0,
            delta_t:                     0.001,
            nstlist:                     10,
            nstcalcenergy:               100,
            nstenergy:                   1000,
            nstlog:                      1000,
            nstxout:                     0,
            nstvout:                     0,
            nstfout:                     0,
            nstdhdl:                     50,
            nstpcouple:                  10,
            nsttcouple:                  10,
            free_energy:                 false,
            init_lambda:                 0.0,
            delta_lambda:                0.0,
            verbose:                     false,
            verbose_step_print_interval: 100,
            write_confout:               true,
            checkpoint_period_minutes:   15.0,
            write_final_checkpoint:      true,
            max_hours:                   None,
            reset_halfway:               false,
            seed:                        0,
        }
    }
}

impl RunConfig {
    /// Reject configurations no signaller could make sense of.
    pub fn validate(&self) -> CoreResult<()> {
        if self.nsteps < -1 {
            return Err(CoreError::Config(format!(
                "nsteps must be -1 (infinite) or non-negative, got {}",
                self.nsteps
            )));
        }
        if !self.delta_t.is_finite() || !self.init_time.is_finite() {
            return Err(CoreError::Config(format!(
                "init_time and delta_t must be finite, got {} and {}",
                self.init_time, self.delta_t
            )));
        }
        let intervals = [
            ("nstlist", self.nstlist),
            ("nstcalcenergy", self.nstcalcenergy),
            ("nstenergy", self.nstenergy),
            ("nstlog", self.nstlog),
            ("nstxout", self.nstxout),
            ("nstvout", self.nstvout),
            ("nstfout", self.nstfout),
            ("nstdhdl", self.nstdhdl),
            ("nstpcouple", self.nstpcouple),
            ("nsttcouple", self.nsttcouple),
        ];
        for (name, value) in intervals {
            if value < 0 {
                return Err(CoreError::NegativeInterval { name, value });
            }
        }
        if self.verbose && self.verbose_step_print_interval <= 0 {
            return Err(CoreError::Config(
                "verbose_step_print_interval must be positive when verbose".into(),
            ));
        }
        if let Some(hours) = self.max_hours {
            if !(hours > 0.0) {
                return Err(CoreError::Config(format!("max_hours must be positive, got {hours}")));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn init_step(&self) -> Step {
        Step(self.init_step)
    }

    /// The step at which the run ends (inclusive), or `Step::MAX` for an
    /// infinite run.
    #[inline]
    pub fn last_step(&self) -> Step {
        if self.nsteps < 0 {
            Step::MAX
        } else {
            Step(self.init_step + self.nsteps)
        }
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.init_time, self.delta_t)
    }
}
