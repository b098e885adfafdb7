//! Free-energy perturbation: the lambda schedule.

use std::cell::RefCell;
use std::rc::Rc;

use ms_core::{Step, Time};
use ms_signal::SignallerClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ElementResult, Registrar, SimulatorElement};

/// Current lambda and the linear schedule it follows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreeEnergyPerturbationData {
    lambda:       f64,
    init_lambda:  f64,
    delta_lambda: f64,
    /// Step at which lambda equals `init_lambda`.  Kept across restarts.
    origin_step:  Step,
}

pub type SharedFreeEnergy = Rc<RefCell<FreeEnergyPerturbationData>>;

impl FreeEnergyPerturbationData {
    pub fn new(init_lambda: f64, delta_lambda: f64, origin_step: Step) -> Self {
        Self { lambda: init_lambda, init_lambda, delta_lambda, origin_step }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn lambda_at(&self, step: Step) -> f64 {
        self.init_lambda + self.delta_lambda * step.since(self.origin_step) as f64
    }

    pub fn update(&mut self, step: Step) {
        self.lambda = self.lambda_at(step);
    }
}

/// Advances lambda at the start of every step.  Placed right after the
/// checkpoint helper so every other element sees the lambda of the current
/// step.
pub struct FreeEnergyPerturbationElement {
    data: SharedFreeEnergy,
}

impl FreeEnergyPerturbationElement {
    pub fn new(data: SharedFreeEnergy) -> Self {
        Self { data }
    }
}

impl SignallerClient for FreeEnergyPerturbationElement {}

impl SimulatorElement for FreeEnergyPerturbationElement {
    fn name(&self) -> &'static str {
        "free-energy perturbation"
    }

    fn schedule_task(&mut self, step: Step, _time: Time, registrar: &mut Registrar<'_>) {
        if self.data.borrow().delta_lambda == 0.0 {
            return;
        }
        let data = Rc::clone(&self.data);
        registrar.register(move || {
            data.borrow_mut().update(step);
            Ok(())
        });
    }

    fn checkpoint_key(&self) -> Option<&'static str> {
        Some("lambda")
    }

    fn write_checkpoint(&self) -> ElementResult<Value> {
        Ok(serde_json::to_value(&*self.data.borrow())?)
    }

    fn restore_checkpoint(&mut self, data: &Value) -> ElementResult<()> {
        *self.data.borrow_mut() = FreeEnergyPerturbationData::deserialize(data)?;
        Ok(())
    }
}
