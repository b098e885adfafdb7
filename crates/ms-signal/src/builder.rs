//! Callback collectors used while the algorithm is being assembled.
//!
//! A signaller receives its client callbacks when it is constructed.  The
//! builders below collect callbacks until then and refuse late
//! registrations: a client registering after the signaller exists would
//! silently never be called.

use crate::{SignalError, SignalResult, SignallerCallback};

// ── Plain signallers ──────────────────────────────────────────────────────────

/// Collects callbacks for a signaller with a single event kind.
pub struct SignallerBuilder {
    signaller: &'static str,
    callbacks: Vec<SignallerCallback>,
    built:     bool,
}

impl SignallerBuilder {
    pub fn new(signaller: &'static str) -> Self {
        Self { signaller, callbacks: Vec::new(), built: false }
    }

    /// Add a client callback.  `None` (client not interested) is always
    /// accepted, even after the signaller was built.
    pub fn register(&mut self, callback: Option<SignallerCallback>) -> SignalResult<()> {
        let Some(callback) = callback else {
            return Ok(());
        };
        if self.built {
            return Err(SignalError::RegisteredAfterBuild { signaller: self.signaller });
        }
        self.callbacks.push(callback);
        Ok(())
    }

    /// Hand the collected callbacks to the signaller being constructed.
    pub fn take_callbacks(&mut self) -> SignalResult<Vec<SignallerCallback>> {
        if self.built {
            return Err(SignalError::BuiltTwice { signaller: self.signaller });
        }
        self.built = true;
        Ok(std::mem::take(&mut self.callbacks))
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }
}

// ── Event signallers ──────────────────────────────────────────────────────────

/// Collects `(event, callback)` pairs for a signaller with several event
/// kinds (energy, trajectory).
pub struct EventSignallerBuilder<E> {
    signaller: &'static str,
    callbacks: Vec<(E, SignallerCallback)>,
    built:     bool,
}

impl<E: Copy + Eq> EventSignallerBuilder<E> {
    pub fn new(signaller: &'static str) -> Self {
        Self { signaller, callbacks: Vec::new(), built: false }
    }

    pub fn register(&mut self, event: E, callback: Option<SignallerCallback>) -> SignalResult<()> {
        let Some(callback) = callback else {
            return Ok(());
        };
        if self.built {
            return Err(SignalError::RegisteredAfterBuild { signaller: self.signaller });
        }
        self.callbacks.push((event, callback));
        Ok(())
    }

    pub fn take_callbacks(&mut self) -> SignalResult<Vec<(E, SignallerCallback)>> {
        if self.built {
            return Err(SignalError::BuiltTwice { signaller: self.signaller });
        }
        self.built = true;
        Ok(std::mem::take(&mut self.callbacks))
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Split `(event, callback)` pairs into the callbacks for one event.
pub(crate) fn callbacks_for<E: Copy + Eq>(
    pairs: &mut Vec<(E, SignallerCallback)>,
    event: E,
) -> Vec<SignallerCallback> {
    let (matching, rest): (Vec<_>, Vec<_>) = pairs.drain(..).partition(|(e, _)| *e == event);
    *pairs = rest;
    matching.into_iter().map(|(_, cb)| cb).collect()
}
