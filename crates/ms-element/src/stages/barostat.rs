//! Berendsen isotropic barostat.

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::{ElementId, Step, Time};
use ms_signal::SignallerClient;
use tracing::debug;

use super::energy::{pressure, SharedEnergy};
use super::state::SharedState;
use crate::wiring::{BoxScaling, PropagatorBarostatConnection, PropagatorTag};
use crate::{
    element_handle, BuildContext, BuildElement, ElementError, ElementResult, Registrar,
    SimulatorElement,
};

/// Berendsen pressure-coupling parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PressureCoupling {
    /// Reference pressure in bar.
    pub ref_pressure:    f64,
    pub tau:             f64,
    /// Isothermal compressibility in bar⁻¹.
    pub compressibility: f64,
    pub nstpcouple:      i64,
    pub dt:              Time,
}

impl PressureCoupling {
    /// Isotropic box scaling factor for the current pressure.
    pub fn scaling_factor(&self, current_pressure: f64) -> f64 {
        if self.tau <= 0.0 {
            return 1.0;
        }
        let coupling = self.nstpcouple as f64 * self.dt / self.tau;
        (1.0 - coupling * self.compressibility * (self.ref_pressure - current_pressure)).cbrt()
    }
}

/// Rescales the box towards the reference pressure every `nstpcouple`
/// steps, using the virial of the last force evaluation.
pub struct BerendsenBarostat {
    coupling: PressureCoupling,
    state:    SharedState,
    energy:   SharedEnergy,
    scalings: Rc<RefCell<Vec<BoxScaling>>>,
}

impl BerendsenBarostat {
    pub fn builder(
        target:          PropagatorTag,
        ref_pressure:    f64,
        tau:             f64,
        compressibility: f64,
    ) -> BarostatBuilder {
        BarostatBuilder { target, ref_pressure, tau, compressibility }
    }

    pub fn coupling(&self) -> PressureCoupling {
        self.coupling
    }
}

impl SignallerClient for BerendsenBarostat {}

impl SimulatorElement for BerendsenBarostat {
    fn name(&self) -> &'static str {
        "berendsen barostat"
    }

    fn schedule_task(&mut self, step: Step, _time: Time, registrar: &mut Registrar<'_>) {
        if !step.is_multiple_of(self.coupling.nstpcouple) {
            return;
        }
        let coupling = self.coupling;
        let state = Rc::clone(&self.state);
        let energy = Rc::clone(&self.energy);
        let scalings = Rc::clone(&self.scalings);
        registrar.register(move || {
            let current = {
                let state = state.borrow();
                pressure(state.kinetic_energy(), energy.borrow().virial, state.volume())
            };
            let mu = coupling.scaling_factor(current);
            for scaling in scalings.borrow().iter() {
                scaling.set([mu; 3]);
            }
            debug!(%step, pressure = current, mu, "barostat coupling");
            Ok(())
        });
    }

    fn element_setup(&mut self) -> ElementResult<()> {
        if self.scalings.borrow().is_empty() {
            return Err(ElementError::MissingConnection {
                element:    "berendsen barostat",
                connection: "propagator",
            });
        }
        Ok(())
    }
}

pub struct BarostatBuilder {
    target:          PropagatorTag,
    ref_pressure:    f64,
    tau:             f64,
    compressibility: f64,
}

impl BuildElement for BarostatBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let scalings = Rc::new(RefCell::new(Vec::new()));
        let connected = Rc::clone(&scalings);
        ctx.wiring().register_barostat(
            "berendsen barostat",
            self.target,
            move |connection: &PropagatorBarostatConnection| {
                connected.borrow_mut().push(connection.box_scaling.clone());
            },
        );
        let barostat = BerendsenBarostat {
            coupling: PressureCoupling {
                ref_pressure:    self.ref_pressure,
                tau:             self.tau,
                compressibility: self.compressibility,
                nstpcouple:      ctx.config().nstpcouple,
                dt:              ctx.config().delta_t,
            },
            state: ctx.state(),
            energy: ctx.energy(),
            scalings,
        };
        Ok(ctx.store_element(element_handle(barostat)))
    }
}
