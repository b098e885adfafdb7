//! Time integration, delegated to an external [`IntegrationKernel`].

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::{ElementId, Step, Time};
use ms_signal::SignallerClient;

use super::state::{SharedState, StatePropagatorData};
use crate::wiring::{
    BoxScaling, PropagatorBarostatConnection, PropagatorTag, PropagatorThermostatConnection,
    VelocityScaling,
};
use crate::{element_handle, BuildContext, BuildElement, ElementResult, Registrar, SimulatorElement};

/// Advances positions and velocities by one step.
pub trait IntegrationKernel {
    /// `velocity_scaling` is the thermostat factor for this step (1.0 when
    /// no coupling happens).
    fn integrate(
        &mut self,
        state:            &mut StatePropagatorData,
        dt:               Time,
        velocity_scaling: f64,
    ) -> ElementResult<()>;
}

/// Runs the kernel every step and applies any pending coupling.
///
/// Offers a thermostat and a barostat connection under its tag; both are
/// optional.
pub struct Propagator {
    tag:              PropagatorTag,
    dt:               Time,
    kernel:           Rc<RefCell<Box<dyn IntegrationKernel>>>,
    state:            SharedState,
    velocity_scaling: VelocityScaling,
    box_scaling:      BoxScaling,
}

impl Propagator {
    pub fn builder(tag: PropagatorTag, kernel: impl IntegrationKernel + 'static) -> PropagatorBuilder {
        PropagatorBuilder { tag, kernel: Box::new(kernel) }
    }

    pub fn tag(&self) -> &PropagatorTag {
        &self.tag
    }
}

impl SignallerClient for Propagator {}

impl SimulatorElement for Propagator {
    fn name(&self) -> &'static str {
        "propagator"
    }

    fn schedule_task(&mut self, _step: Step, _time: Time, registrar: &mut Registrar<'_>) {
        let kernel = Rc::clone(&self.kernel);
        let state = Rc::clone(&self.state);
        let velocity_scaling = self.velocity_scaling.clone();
        let box_scaling = self.box_scaling.clone();
        let dt = self.dt;
        registrar.register(move || {
            let mut state = state.borrow_mut();
            kernel.borrow_mut().integrate(&mut state, dt, velocity_scaling.take())?;
            let mu = box_scaling.take();
            if mu != BoxScaling::IDENTITY {
                state.scale_box(mu);
            }
            Ok(())
        });
    }
}

pub struct PropagatorBuilder {
    tag:    PropagatorTag,
    kernel: Box<dyn IntegrationKernel>,
}

impl BuildElement for PropagatorBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let velocity_scaling = VelocityScaling::new();
        let box_scaling = BoxScaling::new();
        ctx.wiring().register_with_thermostat(PropagatorThermostatConnection {
            tag:              self.tag.clone(),
            velocity_scaling: velocity_scaling.clone(),
        });
        ctx.wiring().register_with_barostat(PropagatorBarostatConnection {
            tag:         self.tag.clone(),
            box_scaling: box_scaling.clone(),
        });
        let propagator = Propagator {
            tag: self.tag,
            dt: ctx.config().delta_t,
            kernel: Rc::new(RefCell::new(self.kernel)),
            state: ctx.state(),
            velocity_scaling,
            box_scaling,
        };
        Ok(ctx.store_element(element_handle(propagator)))
    }
}
