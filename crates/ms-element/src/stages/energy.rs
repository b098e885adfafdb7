//! Energy bookkeeping and the element that computes, logs, and writes it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ms_core::{ElementId, Step, Time};
use ms_signal::{EnergySignallerEvent, SignallerCallback, SignallerClient, TrajectoryEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::free_energy::SharedFreeEnergy;
use super::state::SharedState;
use super::trajectory::{EnergyFrame, TrajectorySink};
use super::{BOLTZMANN, PRESSURE_FACTOR};
use crate::element::TrajectoryWriterCallback;
use crate::{
    element_handle, BuildContext, BuildElement, ElementResult, Registrar, ServiceKind,
    SimulatorElement,
};

/// Temperature from kinetic energy and degrees of freedom.
pub fn temperature(kinetic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return 0.0;
    }
    2.0 * kinetic / (degrees_of_freedom as f64 * BOLTZMANN)
}

/// Instantaneous scalar pressure in bar from kinetic energy and virial.
pub fn pressure(kinetic: f64, virial: f64, volume: f64) -> f64 {
    if volume <= 0.0 {
        return 0.0;
    }
    2.0 / (3.0 * volume) * (kinetic - virial) * PRESSURE_FACTOR
}

/// Running sums for end-of-run averages.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyAverages {
    pub samples:         u64,
    pub sum_total:       f64,
    pub sum_temperature: f64,
    pub sum_pressure:    f64,
}

/// Energies of the most recent energy calculation step.
///
/// `potential`, `virial`, and `dhdl` are filled in by the force element,
/// the rest by the energy element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyData {
    pub kinetic:     f64,
    pub potential:   f64,
    pub virial:      f64,
    pub dhdl:        f64,
    pub temperature: f64,
    pub pressure:    f64,
    pub averages:    EnergyAverages,
}

pub type SharedEnergy = Rc<RefCell<EnergyData>>;

impl EnergyData {
    pub fn total(&self) -> f64 {
        self.kinetic + self.potential
    }

    fn record_sample(&mut self) {
        let averages = &mut self.averages;
        averages.samples += 1;
        averages.sum_total += self.kinetic + self.potential;
        averages.sum_temperature += self.temperature;
        averages.sum_pressure += self.pressure;
    }

    /// Mean total energy, temperature, and pressure over all samples.
    pub fn means(&self) -> Option<(f64, f64, f64)> {
        let a = &self.averages;
        if a.samples == 0 {
            return None;
        }
        let n = a.samples as f64;
        Some((a.sum_total / n, a.sum_temperature / n, a.sum_pressure / n))
    }
}

// ── Element ───────────────────────────────────────────────────────────────────

pub struct EnergyElement {
    energy:       SharedEnergy,
    state:        SharedState,
    free_energy:  Option<SharedFreeEnergy>,
    calc_step:    Rc<Cell<Option<Step>>>,
    logging_step: Rc<Cell<Option<Step>>>,
}

impl EnergyElement {
    pub fn new(energy: SharedEnergy, state: SharedState, free_energy: Option<SharedFreeEnergy>) -> Self {
        Self {
            energy,
            state,
            free_energy,
            calc_step: Rc::new(Cell::new(None)),
            logging_step: Rc::new(Cell::new(None)),
        }
    }

    pub fn builder() -> EnergyElementBuilder {
        EnergyElementBuilder
    }
}

impl SignallerClient for EnergyElement {
    fn register_energy_callback(&mut self, event: EnergySignallerEvent) -> Option<SignallerCallback> {
        if event != EnergySignallerEvent::EnergyCalculationStep {
            return None;
        }
        let calc_step = Rc::clone(&self.calc_step);
        Some(Box::new(move |step, _time| calc_step.set(Some(step))))
    }

    fn register_logging_callback(&mut self) -> Option<SignallerCallback> {
        let logging_step = Rc::clone(&self.logging_step);
        Some(Box::new(move |step, _time| logging_step.set(Some(step))))
    }
}

impl SimulatorElement for EnergyElement {
    fn name(&self) -> &'static str {
        "energy"
    }

    fn schedule_task(&mut self, step: Step, time: Time, registrar: &mut Registrar<'_>) {
        if self.calc_step.get() == Some(step) {
            let energy = Rc::clone(&self.energy);
            let state = Rc::clone(&self.state);
            registrar.register(move || {
                let state = state.borrow();
                let mut energy = energy.borrow_mut();
                energy.kinetic = state.kinetic_energy();
                energy.temperature = temperature(energy.kinetic, state.degrees_of_freedom());
                energy.pressure = pressure(energy.kinetic, energy.virial, state.volume());
                energy.record_sample();
                Ok(())
            });
        }
        if self.logging_step.get() == Some(step) {
            let energy = Rc::clone(&self.energy);
            let free_energy = self.free_energy.clone();
            registrar.register(move || {
                let e = energy.borrow();
                let lambda = free_energy.as_ref().map(|f| f.borrow().lambda());
                info!(
                    %step,
                    time,
                    kinetic = e.kinetic,
                    potential = e.potential,
                    total = e.total(),
                    temperature = e.temperature,
                    pressure = e.pressure,
                    ?lambda,
                    "energies"
                );
                Ok(())
            });
        }
    }

    fn element_teardown(&mut self) -> ElementResult<()> {
        let energy = self.energy.borrow();
        if let Some((total, temperature, pressure)) = energy.means() {
            info!(
                samples = energy.averages.samples,
                total,
                temperature,
                pressure,
                "energy averages over the run"
            );
        }
        Ok(())
    }

    fn checkpoint_key(&self) -> Option<&'static str> {
        Some("energy")
    }

    fn write_checkpoint(&self) -> ElementResult<Value> {
        Ok(serde_json::to_value(&*self.energy.borrow())?)
    }

    fn restore_checkpoint(&mut self, data: &Value) -> ElementResult<()> {
        *self.energy.borrow_mut() = EnergyData::deserialize(data)?;
        Ok(())
    }

    fn register_trajectory_writer_callback(
        &mut self,
        event: TrajectoryEvent,
    ) -> Option<TrajectoryWriterCallback> {
        if event != TrajectoryEvent::EnergyWritingStep {
            return None;
        }
        let energy = Rc::clone(&self.energy);
        let free_energy = self.free_energy.clone();
        Some(Box::new(move |sink: &mut dyn TrajectorySink, step: Step, time: Time| {
            let e = energy.borrow();
            sink.write_energy(&EnergyFrame {
                step,
                time,
                kinetic:     e.kinetic,
                potential:   e.potential,
                total:       e.total(),
                temperature: e.temperature,
                pressure:    e.pressure,
                lambda:      free_energy.as_ref().map(|f| f.borrow().lambda()),
                dhdl:        e.dhdl,
            })
        }))
    }
}

pub struct EnergyElementBuilder;

impl BuildElement for EnergyElementBuilder {
    fn build(self, ctx: &mut BuildContext<'_>) -> ElementResult<ElementId> {
        let element = EnergyElement::new(ctx.energy(), ctx.state(), ctx.free_energy());
        ctx.service(ServiceKind::EnergyData, move || Ok(element_handle(element)))
    }
}
