//! Simulation step and time model.
//!
//! # Design
//!
//! The canonical time unit is the integer `Step`.  Physical time is always
//! derived from it through `SimClock`:
//!
//!   time = init_time + step * delta_t
//!
//! and is never stored independently, so a rewind of the step counter can
//! never leave a stale time behind.  Steps are signed: runs continued from a
//! checkpoint or equilibration protocols may start at zero or below.

use std::fmt;

/// Physical simulation time (ps in MD units).
pub type Time = f64;

// ── Step ─────────────────────────────────────────────────────────────────────

/// An absolute simulation step index.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step(pub i64);

impl Step {
    pub const ZERO: Step = Step(0);

    /// Sentinel for "never reached", e.g. the last step of an infinite run.
    pub const MAX: Step = Step(i64::MAX);

    /// The step after `self`.
    #[inline]
    pub fn next(self) -> Step {
        Step(self.0 + 1)
    }

    /// Steps elapsed from `earlier` to `self`.  Negative if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Step) -> i64 {
        self.0 - earlier.0
    }

    /// Whether `self` falls on a multiple of `interval`.
    ///
    /// An interval of zero or below never matches, which is how every
    /// `nst*` setting of zero disables the corresponding output.
    #[inline]
    pub fn is_multiple_of(self, interval: i64) -> bool {
        interval > 0 && self.0 % interval == 0
    }
}

impl std::ops::Add<i64> for Step {
    type Output = Step;
    #[inline]
    fn add(self, rhs: i64) -> Step {
        Step(self.0 + rhs)
    }
}

impl std::ops::AddAssign<i64> for Step {
    #[inline]
    fn add_assign(&mut self, rhs: i64) {
        self.0 += rhs;
    }
}

impl std::ops::Sub for Step {
    type Output = i64;
    #[inline]
    fn sub(self, rhs: Step) -> i64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Step::MAX {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Maps steps to physical time.
///
/// `SimClock` is cheap to copy and intentionally holds no heap data.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Time at step zero.
    pub init_time: Time,
    /// Time increment per step.
    pub delta_t: Time,
}

impl SimClock {
    pub fn new(init_time: Time, delta_t: Time) -> Self {
        Self { init_time, delta_t }
    }

    /// Physical time of `step`.
    #[inline]
    pub fn time_at(&self, step: Step) -> Time {
        self.init_time + step.0 as f64 * self.delta_t
    }
}
