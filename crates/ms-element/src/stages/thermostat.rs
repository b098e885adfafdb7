//! Berendsen velocity-scaling thermostat.

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::{ElementId, Step, Time};
use ms_signal::SignallerClient;
use serde_json::Value;
use tracing::debug;

use super::energy::temperature;
use super::state::SharedState;
use crate::wiring::{PropagatorTag, PropagatorThermostatConnection, VelocityScaling};
use crate::{
    element_handle, BuildContext, BuildElement, ElementError, ElementResult, Registrar,
    SimulatorElement,
};

/// Scaling factors are clamped to this range.
const LAMBDA_RANGE: (f64, f64) = (0.8, 1.25);

struct ThermostatState {
    scalings:       Vec<VelocityScaling>,
    /// Kinetic energy removed so far, for the conserved energy.
    removed_energy: f64,
}

/// Berendsen coupling parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TemperatureCoupling {
    pub ref_temperature: f64,
    pub tau:             f64,
    pub nsttcouple:      i64,
    pub dt:              Time,
}

impl TemperatureCoupling {
    /// The Berendsen factor for the current temperature.
    pub fn scaling_factor(&self, current_temperature: f64) -> f64 {
        if current_temperature <= 0.0 || self.tau <= 0.0 {
            return 1.0;
        }
        let coupling = self.nsttcouple as f64 * self.dt / self.tau;
        let lambda = (1.0 + coupling * (self.ref_temperature / current_temperature - 1.0)).max(0.0).sqrt();
        lambda.clamp(LAMBDA_RANGE.0, LAMBDA_RANGE.1)
    }
}

/// Scales velocities towards the reference temperature every `nsttcouple`
/// steps.
pub struct VelocityScalingThermostat {
    coupling: TemperatureCoupling,
    state:    SharedState,
    inner:    Rc<RefCell<ThermostatState>>,
}

impl VelocityScalingThermostat {
    pub fn builder(target: PropagatorTag, ref_temperature: f64, tau: f64) -> ThermostatBuilder {
        ThermostatBuilder { target, ref_temperature, tau }
    }

    pub fn coupling(&self) -> TemperatureCoupling {
        self.coupling
    }

    pub fn removed_energy(&self) -> f64 {
        self.inner.borrow().removed_energy
    }
}

impl SignallerClient for VelocityScalingThermostat {}

impl SimulatorElement for VelocityScalingThermostat {
    fn name(&self) -> &'static str {
        "velocity-scaling thermostat"
    }

    fn schedule_task(&mut self, step: Step, _time: Time, registrar: &mut Registrar<'_>) {
        if !step.is_multiple_of(self.coupling.nsttcouple) {
            return;
        }
        let state = Rc::clone(&self.state);
        let inner = Rc::clone(&self.inner);
        let coupling = self.coupling;
        registrar.register(move || {
            let (kinetic, ndf) = {
                let state = state.borrow();
                (state.kinetic_energy(), state.degrees_of_freedom())
            };
            let lambda = coupling.scaling_factor(temperature(kinetic, ndf));
            let mut inner = inner.borrow_mut();
            inner.removed_energy += kinetic * (1.0 - lambda * lambda);
            for scaling in &inner.scalings {
                scaling.set(lambda);
            }
            debug!(%step, lambda, "thermostat coupling");
            Ok(())
        });
    }

    fn element_setup(&mut self) -> ElementResult<()> {
        if self.inner.borrow().scalings.is_empty() {
            return Err(ElementError::MissingConnection {
                element:    "velocity-scaling thermostat",
                connection: "propagator",
            });
        }
        Ok(())
    }

    fn checkpoint_key(&self) -> Option<&'static str> {
        Some("thermostat")
    }

    fn write_checkpoint(&self) -> ElementResult<Value> {
        Ok(serde_json::json!({ "removed_energy": self.inner.borrow().removed_energy }))
    }

    fn restore_checkpoint(&mut self, data: &Value) -> ElementResult<()> {
        let removed = data.get("removed_energy").and_then(Value::as_f64).ok_or_else(|| {
            ElementError::Checkpoint { key: "thermostat", reason: "missing removed_energy".into() }
        })?;
        self.inner.borrow_mut().removed_energy = removed;
        Ok(())
    }
}

pub struct ThermostatBuilder {
    target:          PropagatorTag,
    ref_temperature: f64,
    tau:             f64,
}

impl BuildElement for ThermostatBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let inner = Rc::new(RefCell::new(ThermostatState { scalings: Vec::new(), removed_energy: 0.0 }));
        let connected = Rc::clone(&inner);
        ctx.wiring().register_thermostat(
            "velocity-scaling thermostat",
            self.target,
            move |connection: &PropagatorThermostatConnection| {
                connected.borrow_mut().scalings.push(connection.velocity_scaling.clone());
            },
        );
        let thermostat = VelocityScalingThermostat {
            coupling: TemperatureCoupling {
                ref_temperature: self.ref_temperature,
                tau:             self.tau,
                nsttcouple:      ctx.config().nsttcouple,
                dt:              ctx.config().delta_t,
            },
            state: ctx.state(),
            inner,
        };
        Ok(ctx.store_element(element_handle(thermostat)))
    }
}
