//! Force calculation, delegated to an external [`ForceProvider`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ms_core::{ElementId, Step, Time};
use ms_signal::{EnergySignallerEvent, SignallerCallback, SignallerClient};

use super::energy::SharedEnergy;
use super::free_energy::SharedFreeEnergy;
use super::state::{SharedState, StatePropagatorData};
use crate::{
    element_handle, BuildContext, BuildElement, ElementResult, Registrar, ServiceKind,
    SimulatorElement,
};

/// What the force provider must compute on this step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ForceFlags {
    pub is_ns_step:          bool,
    pub compute_energy:      bool,
    pub compute_virial:      bool,
    pub compute_free_energy: bool,
}

/// Inputs to one force evaluation.
pub struct ForceRequest<'a> {
    pub step:      Step,
    pub time:      Time,
    pub positions: &'a [[f64; 3]],
    pub box_diag:  [f64; 3],
    pub lambda:    f64,
    pub flags:     ForceFlags,
}

/// Scalars a force evaluation may produce, depending on the flags.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ForceOutput {
    pub potential: f64,
    pub virial:    f64,
    pub dhdl:      f64,
}

/// Computes forces for the current positions.  `forces` is zeroed before
/// the call.
pub trait ForceProvider {
    fn compute(&mut self, request: ForceRequest<'_>, forces: &mut [[f64; 3]]) -> ElementResult<ForceOutput>;
}

pub struct ForceElement {
    provider:    Rc<RefCell<Box<dyn ForceProvider>>>,
    state:       SharedState,
    energy:      SharedEnergy,
    free_energy: Option<SharedFreeEnergy>,
    ns_step:     Rc<Cell<Option<Step>>>,
    energy_step: Rc<Cell<Option<Step>>>,
    virial_step: Rc<Cell<Option<Step>>>,
    fe_step:     Rc<Cell<Option<Step>>>,
}

impl ForceElement {
    pub fn new(
        provider:    Box<dyn ForceProvider>,
        state:       SharedState,
        energy:      SharedEnergy,
        free_energy: Option<SharedFreeEnergy>,
    ) -> Self {
        Self {
            provider: Rc::new(RefCell::new(provider)),
            state,
            energy,
            free_energy,
            ns_step: Rc::new(Cell::new(None)),
            energy_step: Rc::new(Cell::new(None)),
            virial_step: Rc::new(Cell::new(None)),
            fe_step: Rc::new(Cell::new(None)),
        }
    }

    /// Builder for the force element.  Only the first provider added is
    /// used; later builders return the existing element.
    pub fn builder(provider: impl ForceProvider + 'static) -> ForceElementBuilder {
        ForceElementBuilder { provider: Box::new(provider) }
    }

    fn step_cell(&self, event: EnergySignallerEvent) -> &Rc<Cell<Option<Step>>> {
        match event {
            EnergySignallerEvent::EnergyCalculationStep => &self.energy_step,
            EnergySignallerEvent::VirialCalculationStep => &self.virial_step,
            EnergySignallerEvent::FreeEnergyCalculationStep => &self.fe_step,
        }
    }
}

impl SignallerClient for ForceElement {
    fn register_ns_callback(&mut self) -> Option<SignallerCallback> {
        let ns_step = Rc::clone(&self.ns_step);
        Some(Box::new(move |step, _time| ns_step.set(Some(step))))
    }

    fn register_energy_callback(&mut self, event: EnergySignallerEvent) -> Option<SignallerCallback> {
        let cell = Rc::clone(self.step_cell(event));
        Some(Box::new(move |step, _time| cell.set(Some(step))))
    }
}

impl SimulatorElement for ForceElement {
    fn name(&self) -> &'static str {
        "forces"
    }

    fn schedule_task(&mut self, step: Step, time: Time, registrar: &mut Registrar<'_>) {
        let flags = ForceFlags {
            is_ns_step:          self.ns_step.get() == Some(step),
            compute_energy:      self.energy_step.get() == Some(step),
            compute_virial:      self.virial_step.get() == Some(step),
            compute_free_energy: self.fe_step.get() == Some(step),
        };
        let provider = Rc::clone(&self.provider);
        let state = Rc::clone(&self.state);
        let energy = Rc::clone(&self.energy);
        let free_energy = self.free_energy.clone();
        registrar.register(move || {
            let lambda = free_energy.as_ref().map_or(0.0, |f| f.borrow().lambda());
            let mut state = state.borrow_mut();
            let StatePropagatorData { positions, forces, box_diag, .. } = &mut *state;
            forces.iter_mut().for_each(|f| *f = [0.0; 3]);
            let request = ForceRequest { step, time, positions, box_diag: *box_diag, lambda, flags };
            let output = provider.borrow_mut().compute(request, forces)?;

            let mut energy = energy.borrow_mut();
            if flags.compute_energy {
                energy.potential = output.potential;
            }
            if flags.compute_virial {
                energy.virial = output.virial;
            }
            if flags.compute_free_energy {
                energy.dhdl = output.dhdl;
            }
            Ok(())
        });
    }
}

pub struct ForceElementBuilder {
    provider: Box<dyn ForceProvider>,
}

impl BuildElement for ForceElementBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let element = ForceElement::new(self.provider, ctx.state(), ctx.energy(), ctx.free_energy());
        ctx.service(ServiceKind::Forces, move || Ok(element_handle(element)))
    }
}
