//! Deferred wiring between coupling controllers and propagators.
//!
//! Controllers (thermostats, barostats) and the propagators they act on are
//! built independently and in any order.  During assembly, propagators offer
//! connection records tagged with their [`PropagatorTag`] and controllers
//! register a connect function for the tag they target.  When the algorithm
//! is built, [`Wiring::connect_all`] applies every registration to every
//! connection carrying the same tag.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Names a propagator so controllers can target it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PropagatorTag(pub String);

impl PropagatorTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl fmt::Display for PropagatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Shared scaling state ──────────────────────────────────────────────────────

/// Velocity scaling factor set by a thermostat and consumed by a propagator.
#[derive(Clone, Debug)]
pub struct VelocityScaling(Rc<Cell<f64>>);

impl VelocityScaling {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(1.0)))
    }

    pub fn set(&self, factor: f64) {
        self.0.set(factor);
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }

    /// Return the pending factor and fall back to no scaling.
    pub fn take(&self) -> f64 {
        self.0.replace(1.0)
    }
}

impl Default for VelocityScaling {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-axis box scaling set by a barostat and consumed by a propagator.
#[derive(Clone, Debug)]
pub struct BoxScaling(Rc<Cell<[f64; 3]>>);

impl BoxScaling {
    pub const IDENTITY: [f64; 3] = [1.0; 3];

    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Self::IDENTITY)))
    }

    pub fn set(&self, mu: [f64; 3]) {
        self.0.set(mu);
    }

    pub fn take(&self) -> [f64; 3] {
        self.0.replace(Self::IDENTITY)
    }
}

impl Default for BoxScaling {
    fn default() -> Self {
        Self::new()
    }
}

// ── Connection records ────────────────────────────────────────────────────────

/// Offered by a propagator to any thermostat targeting its tag.
#[derive(Clone, Debug)]
pub struct PropagatorThermostatConnection {
    pub tag:              PropagatorTag,
    pub velocity_scaling: VelocityScaling,
}

/// Offered by a propagator to any barostat targeting its tag.
#[derive(Clone, Debug)]
pub struct PropagatorBarostatConnection {
    pub tag:         PropagatorTag,
    pub box_scaling: BoxScaling,
}

/// A controller's request to be connected to the propagator(s) with
/// `target` tag.
pub struct Registration<C> {
    pub controller: &'static str,
    pub target:     PropagatorTag,
    pub connect:    Box<dyn FnMut(&C)>,
}

/// A registration no connection matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnmatchedRegistration {
    pub controller: &'static str,
    pub target:     PropagatorTag,
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Pending connections and registrations, consumed once at build.
#[derive(Default)]
pub struct Wiring {
    thermostat_connections:   Vec<PropagatorThermostatConnection>,
    barostat_connections:     Vec<PropagatorBarostatConnection>,
    thermostat_registrations: Vec<Registration<PropagatorThermostatConnection>>,
    barostat_registrations:   Vec<Registration<PropagatorBarostatConnection>>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_with_thermostat(&mut self, connection: PropagatorThermostatConnection) {
        self.thermostat_connections.push(connection);
    }

    pub fn register_with_barostat(&mut self, connection: PropagatorBarostatConnection) {
        self.barostat_connections.push(connection);
    }

    pub fn register_thermostat(
        &mut self,
        controller: &'static str,
        target:     PropagatorTag,
        connect:    impl FnMut(&PropagatorThermostatConnection) + 'static,
    ) {
        self.thermostat_registrations.push(Registration {
            controller,
            target,
            connect: Box::new(connect),
        });
    }

    pub fn register_barostat(
        &mut self,
        controller: &'static str,
        target:     PropagatorTag,
        connect:    impl FnMut(&PropagatorBarostatConnection) + 'static,
    ) {
        self.barostat_registrations.push(Registration {
            controller,
            target,
            connect: Box::new(connect),
        });
    }

    pub fn pending_registrations(&self) -> usize {
        self.thermostat_registrations.len() + self.barostat_registrations.len()
    }

    /// Apply every registration to every connection with the same tag.
    ///
    /// Fails on the first registration that matched nothing; connections
    /// nobody registered for are fine.
    pub fn connect_all(&mut self) -> Result<(), UnmatchedRegistration> {
        apply(&mut self.thermostat_registrations, &self.thermostat_connections, |c| &c.tag)?;
        apply(&mut self.barostat_registrations, &self.barostat_connections, |c| &c.tag)?;
        self.thermostat_connections.clear();
        self.barostat_connections.clear();
        Ok(())
    }
}

fn apply<C>(
    registrations: &mut Vec<Registration<C>>,
    connections:   &[C],
    tag_of:        impl Fn(&C) -> &PropagatorTag,
) -> Result<(), UnmatchedRegistration> {
    for mut registration in registrations.drain(..) {
        let mut matched = false;
        for connection in connections.iter().filter(|c| *tag_of(c) == registration.target) {
            (registration.connect)(connection);
            matched = true;
        }
        if !matched {
            return Err(UnmatchedRegistration {
                controller: registration.controller,
                target:     registration.target,
            });
        }
    }
    Ok(())
}
