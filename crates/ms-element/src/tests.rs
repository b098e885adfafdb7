//! Unit tests for tasks, ownership, wiring, and the reference stages.

#[cfg(test)]
mod support {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::{Step, Time};
    use ms_signal::SignallerClient;

    use crate::stages::{EnergyFrame, StateFrame, StatePropagatorData, TrajectorySink};
    use crate::{ElementResult, Registrar, SimulatorElement};

    /// Element that registers one task per step, logging `(name, step)`.
    pub struct Recording {
        pub name: &'static str,
        pub log:  Rc<RefCell<Vec<(&'static str, i64)>>>,
    }

    impl SignallerClient for Recording {}

    impl SimulatorElement for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn schedule_task(&mut self, step: Step, _time: Time, registrar: &mut Registrar<'_>) {
            let log = Rc::clone(&self.log);
            let name = self.name;
            registrar.register(move || {
                log.borrow_mut().push((name, step.0));
                Ok(())
            });
        }
    }

    #[derive(Default)]
    pub struct MemorySink {
        pub states:   Rc<RefCell<Vec<StateFrame>>>,
        pub energies: Rc<RefCell<Vec<EnergyFrame>>>,
    }

    impl TrajectorySink for MemorySink {
        fn write_state(&mut self, frame: &StateFrame) -> ElementResult<()> {
            self.states.borrow_mut().push(frame.clone());
            Ok(())
        }

        fn write_energy(&mut self, frame: &EnergyFrame) -> ElementResult<()> {
            self.energies.borrow_mut().push(frame.clone());
            Ok(())
        }
    }

    pub fn two_atoms() -> StatePropagatorData {
        let mut state = StatePropagatorData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![1.0, 2.0],
            [2.0, 2.0, 2.0],
        );
        state.velocities = vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        state
    }
}

#[cfg(test)]
mod task {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::Step;

    use super::support::Recording;
    use crate::{Registrar, SimulatorElement, TaskKind};

    #[test]
    fn registrar_binds_step_and_owner() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut element = Recording { name: "rec", log: Rc::clone(&log) };
        let mut tasks = Vec::new();
        let mut registrar = Registrar::new(&mut tasks, Step(7), "rec");
        element.schedule_task(Step(7), 0.7, &mut registrar);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].step(), Step(7));
        assert_eq!(tasks[0].kind(), TaskKind::Element);
        assert_eq!(tasks[0].owner(), "rec");
        assert!(log.borrow().is_empty(), "scheduling must not run the task");

        tasks[0].run().unwrap();
        assert_eq!(*log.borrow(), vec![("rec", 7)]);
    }
}

#[cfg(test)]
mod store {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::ElementId;

    use super::support::Recording;
    use crate::{dedup_ids, element_handle, ElementStore};

    #[test]
    fn same_handle_stored_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = element_handle(Recording { name: "a", log: Rc::clone(&log) });
        let b = element_handle(Recording { name: "b", log });
        let mut store = ElementStore::new();

        let id_a = store.store(Rc::clone(&a));
        let id_b = store.store(Rc::clone(&b));
        assert_eq!(store.store(Rc::clone(&a)), id_a);
        assert_ne!(id_a, id_b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(id_b).unwrap().borrow().name(), "b");
        assert!(store.get(ElementId(5)).is_none());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let ids = [ElementId(2), ElementId(0), ElementId(2), ElementId(1), ElementId(0)];
        assert_eq!(dedup_ids(&ids), vec![ElementId(2), ElementId(0), ElementId(1)]);
    }
}

#[cfg(test)]
mod registry {
    use ms_core::ElementId;

    use crate::{ServiceKind, ServiceRegistry};

    #[test]
    fn get_or_insert_creates_once() {
        let mut registry = ServiceRegistry::new();
        let mut calls = 0;
        for _ in 0..3 {
            let id = registry
                .get_or_insert_with::<()>(ServiceKind::Forces, || {
                    calls += 1;
                    Ok(ElementId(4))
                })
                .unwrap();
            assert_eq!(id, ElementId(4));
        }
        assert_eq!(calls, 1);
        assert_eq!(registry.get(ServiceKind::EnergyData), None);
    }

    #[test]
    fn failed_creation_is_not_recorded() {
        let mut registry = ServiceRegistry::new();
        let err = registry.get_or_insert_with(ServiceKind::Forces, || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert_eq!(registry.get(ServiceKind::Forces), None);
    }
}

#[cfg(test)]
mod wiring {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::{
        PropagatorTag, PropagatorThermostatConnection, UnmatchedRegistration, VelocityScaling,
        Wiring,
    };

    #[test]
    fn registration_applies_to_every_matching_connection() {
        let mut wiring = Wiring::new();
        let tag = PropagatorTag::new("leapfrog");
        let first = VelocityScaling::new();
        let second = VelocityScaling::new();
        for scaling in [&first, &second] {
            wiring.register_with_thermostat(PropagatorThermostatConnection {
                tag:              tag.clone(),
                velocity_scaling: scaling.clone(),
            });
        }
        let connections = Rc::new(Cell::new(0));
        let counter = Rc::clone(&connections);
        wiring.register_thermostat("thermostat", tag, move |connection| {
            connection.velocity_scaling.set(0.9);
            counter.set(counter.get() + 1);
        });
        wiring.connect_all().unwrap();

        assert_eq!(connections.get(), 2);
        assert_eq!(first.get(), 0.9);
        assert_eq!(second.take(), 0.9);
        assert_eq!(second.get(), 1.0);
    }

    #[test]
    fn unmatched_registration_is_reported() {
        let mut wiring = Wiring::new();
        wiring.register_with_thermostat(PropagatorThermostatConnection {
            tag:              PropagatorTag::new("a"),
            velocity_scaling: VelocityScaling::new(),
        });
        wiring.register_barostat("barostat", PropagatorTag::new("b"), |_| {});
        assert_eq!(
            wiring.connect_all(),
            Err(UnmatchedRegistration { controller: "barostat", target: PropagatorTag::new("b") })
        );
    }
}

#[cfg(test)]
mod stages {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::{ElementId, RunConfig, Step};
    use ms_signal::{EnergySignallerEvent, SignallerClient, TrajectoryEvent};

    use super::support::{two_atoms, MemorySink};
    use crate::stages::{
        EnergyData, ForceElement, ForceOutput, ForceProvider, ForceRequest,
        FreeEnergyPerturbationData, FreeEnergyPerturbationElement, StateElement,
        TemperatureCoupling, TrajectoryElement,
    };
    use crate::{
        BuildContext, BuildElement, ElementError, ElementResult, ElementStore, Registrar,
        ServiceRegistry, SimulatorElement, Wiring,
    };

    #[test]
    fn kinetic_energy_and_volume() {
        let state = two_atoms();
        assert_eq!(state.kinetic_energy(), 0.5 * 1.0 + 0.5 * 2.0);
        assert_eq!(state.volume(), 8.0);
        assert_eq!(state.degrees_of_freedom(), 6);
    }

    #[test]
    fn generated_velocities_are_reproducible() {
        let mut a = two_atoms();
        let mut b = two_atoms();
        a.generate_velocities(300.0, 42);
        b.generate_velocities(300.0, 42);
        assert_eq!(a.velocities, b.velocities);
        b.generate_velocities(300.0, 43);
        assert_ne!(a.velocities, b.velocities);
    }

    #[test]
    fn state_checkpoint_restores_and_checks_size() {
        let shared = Rc::new(RefCell::new(two_atoms()));
        let element = StateElement::new(Rc::clone(&shared));
        let saved = element.write_checkpoint().unwrap();

        shared.borrow_mut().positions[1] = [9.0, 9.0, 9.0];
        let mut element = element;
        element.restore_checkpoint(&saved).unwrap();
        assert_eq!(shared.borrow().positions[1], [1.0, 0.0, 0.0]);

        let mut other = StateElement::new(Rc::new(RefCell::new(
            crate::stages::StatePropagatorData::new(vec![[0.0; 3]], vec![1.0], [1.0; 3]),
        )));
        assert!(matches!(
            other.restore_checkpoint(&saved),
            Err(ElementError::Checkpoint { key: "state", .. })
        ));
    }

    #[test]
    fn lambda_follows_linear_schedule() {
        let data = Rc::new(RefCell::new(FreeEnergyPerturbationData::new(0.2, 0.01, Step(10))));
        let mut element = FreeEnergyPerturbationElement::new(Rc::clone(&data));
        let mut tasks = Vec::new();
        element.schedule_task(Step(15), 0.0, &mut Registrar::new(&mut tasks, Step(15), "fep"));
        tasks[0].run().unwrap();
        assert!((data.borrow().lambda() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn thermostat_factor_is_clamped() {
        let coupling = TemperatureCoupling { ref_temperature: 300.0, tau: 0.1, nsttcouple: 10, dt: 0.002 };
        assert_eq!(coupling.scaling_factor(300.0), 1.0);
        assert!(coupling.scaling_factor(310.0) < 1.0);
        assert_eq!(coupling.scaling_factor(1.0), 1.25);
        assert_eq!(coupling.scaling_factor(0.0), 1.0);
    }

    struct ConstantForce;

    impl ForceProvider for ConstantForce {
        fn compute(&mut self, request: ForceRequest<'_>, forces: &mut [[f64; 3]]) -> ElementResult<ForceOutput> {
            for f in forces.iter_mut() {
                *f = [1.0, 0.0, 0.0];
            }
            Ok(ForceOutput {
                potential: request.positions.len() as f64,
                virial:    -1.0,
                dhdl:      0.0,
            })
        }
    }

    #[test]
    fn force_energy_only_on_energy_steps() {
        let state = Rc::new(RefCell::new(two_atoms()));
        let energy = Rc::new(RefCell::new(EnergyData::default()));
        let mut forces = ForceElement::new(Box::new(ConstantForce), Rc::clone(&state), Rc::clone(&energy), None);
        let mut energy_cb = forces
            .register_energy_callback(EnergySignallerEvent::EnergyCalculationStep)
            .unwrap();

        let mut tasks = Vec::new();
        forces.schedule_task(Step(1), 0.0, &mut Registrar::new(&mut tasks, Step(1), "forces"));
        tasks[0].run().unwrap();
        assert_eq!(state.borrow().forces[0], [1.0, 0.0, 0.0]);
        assert_eq!(energy.borrow().potential, 0.0);

        energy_cb(Step(2), 0.0);
        tasks.clear();
        forces.schedule_task(Step(2), 0.0, &mut Registrar::new(&mut tasks, Step(2), "forces"));
        tasks[0].run().unwrap();
        assert_eq!(energy.borrow().potential, 2.0);
        assert_eq!(energy.borrow().virial, 0.0, "virial not requested");
    }

    #[test]
    fn trajectory_element_runs_writers_on_signalled_steps() {
        let sink = MemorySink::default();
        let states = Rc::clone(&sink.states);
        let mut trajectory = TrajectoryElement::new(Box::new(sink));

        let shared = Rc::new(RefCell::new(two_atoms()));
        let mut state_element = StateElement::new(Rc::clone(&shared));
        let mut last_cb = state_element.register_last_step_callback().unwrap();
        trajectory.register_writer_client(&mut state_element);
        let mut state_step = trajectory
            .register_trajectory_signaller_callback(TrajectoryEvent::StateWritingStep)
            .unwrap();

        let mut tasks = Vec::new();
        trajectory.schedule_task(Step(1), 0.1, &mut Registrar::new(&mut tasks, Step(1), "trajectory"));
        assert!(tasks.is_empty());

        state_step(Step(2), 0.2);
        last_cb(Step(2), 0.2);
        trajectory.schedule_task(Step(2), 0.2, &mut Registrar::new(&mut tasks, Step(2), "trajectory"));
        tasks[0].run().unwrap();

        let frames = states.borrow();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].step, Step(2));
        assert!(frames[0].is_final);
        assert_eq!(trajectory.frames_written().state, 1);
    }

    #[test]
    fn unsignalled_negative_step_writes_and_computes_nothing() {
        let mut trajectory = TrajectoryElement::new(Box::new(MemorySink::default()));
        let mut tasks = Vec::new();
        trajectory.schedule_task(Step(-1), -0.1, &mut Registrar::new(&mut tasks, Step(-1), "trajectory"));
        assert!(tasks.is_empty());

        let state = Rc::new(RefCell::new(two_atoms()));
        let energy = Rc::new(RefCell::new(EnergyData::default()));
        let mut forces = ForceElement::new(Box::new(ConstantForce), Rc::clone(&state), Rc::clone(&energy), None);
        forces.schedule_task(Step(-1), -0.1, &mut Registrar::new(&mut tasks, Step(-1), "forces"));
        tasks[0].run().unwrap();
        assert_eq!(energy.borrow().potential, 0.0);
        assert_eq!(energy.borrow().virial, 0.0);
    }

    #[test]
    fn service_builders_share_one_element() {
        let config = RunConfig::default();
        let mut store = ElementStore::new();
        let mut registry = ServiceRegistry::new();
        let mut wiring = Wiring::new();
        let state = Rc::new(RefCell::new(two_atoms()));
        let energy = Rc::new(RefCell::new(EnergyData::default()));
        let mut ctx = BuildContext::new(
            &config, &mut store, &mut registry, &mut wiring, &state, &energy, None,
        );

        let first = ForceElement::builder(ConstantForce).build(&mut ctx).unwrap();
        let second = ForceElement::builder(ConstantForce).build(&mut ctx).unwrap();
        let state_id = StateElement::builder().build(&mut ctx).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, state_id);
        assert_eq!(first, ElementId(0));
        assert_eq!(store.len(), 2);
    }
}
