//! Stop requests and the reference stop monitor.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ms_core::Step;
use ms_signal::StopMonitor;
use tracing::{info, warn};

/// How urgently the run should end.  Ordered by urgency.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
#[repr(u8)]
pub enum StopSignal {
    #[default]
    None = 0,
    /// Stop at the next re-partition step.
    StopAtNextNsStep = 1,
    /// Stop after the current step.
    StopImmediately = 2,
}

impl StopSignal {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StopSignal::None,
            1 => StopSignal::StopAtNextNsStep,
            _ => StopSignal::StopImmediately,
        }
    }
}

/// Thread-safe stop flag.  Clone it into an OS signal handler or another
/// thread; every [`request`][Self::request] escalates the signal one level.
#[derive(Clone, Debug, Default)]
pub struct StopRequest(Arc<AtomicU8>);

impl StopRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalate and return the new signal.
    pub fn request(&self) -> StopSignal {
        let previous = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some((v + 1).min(StopSignal::StopImmediately as u8))
            })
            .unwrap_or(StopSignal::StopImmediately as u8);
        StopSignal::from_u8((previous + 1).min(StopSignal::StopImmediately as u8))
    }

    pub fn current(&self) -> StopSignal {
        StopSignal::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Fraction of `max_hours` after which the run is asked to stop, leaving
/// time to write the final checkpoint.
const MAX_HOURS_FRACTION: f64 = 0.99;

/// Evaluates the stop conditions once per step ([`set_signal`]) and answers
/// whether the run ends after a given step.
///
/// A condition raised in step `s` takes effect from step `s + 1` on.
///
/// [`set_signal`]: StopMonitor::set_signal
pub struct StopHandler {
    request:   StopRequest,
    nstlist:   i64,
    max_hours: Option<f64>,
    started:   Instant,
    signal:    StopSignal,
}

impl StopHandler {
    pub fn new(request: StopRequest, nstlist: i64, max_hours: Option<f64>) -> Self {
        Self { request, nstlist, max_hours, started: Instant::now(), signal: StopSignal::None }
    }

    pub fn signal(&self) -> StopSignal {
        self.signal
    }

    fn out_of_time(&self) -> bool {
        self.max_hours.is_some_and(|hours| {
            self.started.elapsed().as_secs_f64() / 3600.0 >= MAX_HOURS_FRACTION * hours
        })
    }
}

impl StopMonitor for StopHandler {
    fn stopping_after_current_step(&self, _step: Step, is_ns_step: bool) -> bool {
        match self.signal {
            StopSignal::None => false,
            StopSignal::StopAtNextNsStep => is_ns_step || self.nstlist == 0,
            StopSignal::StopImmediately => true,
        }
    }

    fn set_signal(&mut self, step: Step, _is_ns_step: bool) {
        let mut wanted = self.request.current();
        if wanted.max(self.signal) < StopSignal::StopAtNextNsStep && self.out_of_time() {
            warn!(%step, max_hours = ?self.max_hours, "wall-time budget nearly used, stopping at next re-partition step");
            wanted = StopSignal::StopAtNextNsStep;
        }
        if wanted > self.signal {
            info!(%step, signal = ?wanted, "stop requested");
            self.signal = wanted;
        }
    }
}
