//! Unit tests for the signallers and their builders.

#[cfg(test)]
mod support {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::Step;

    use crate::{SignallerCallback, StopMonitor};

    /// Records every step a callback fired on.
    pub fn recorder() -> (Rc<RefCell<Vec<i64>>>, SignallerCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, Box::new(move |step: Step, _time| sink.borrow_mut().push(step.0)))
    }

    /// Requests a stop after a fixed step.
    pub struct StopAfter(pub i64);

    impl StopMonitor for StopAfter {
        fn stopping_after_current_step(&self, step: Step, _is_ns_step: bool) -> bool {
            step.0 == self.0
        }

        fn set_signal(&mut self, _step: Step, _is_ns_step: bool) {}
    }
}

#[cfg(test)]
mod builder {
    use super::support::recorder;
    use crate::{EnergySignallerEvent, EventSignallerBuilder, SignalError, SignallerBuilder};

    #[test]
    fn late_registration_rejected() {
        let mut builder = SignallerBuilder::new("logging");
        let (_, cb) = recorder();
        builder.register(Some(cb)).unwrap();
        assert_eq!(builder.take_callbacks().unwrap().len(), 1);

        let (_, late) = recorder();
        let err = builder.register(Some(late)).unwrap_err();
        assert!(matches!(err, SignalError::RegisteredAfterBuild { signaller: "logging" }));
    }

    #[test]
    fn none_accepted_after_build() {
        let mut builder = SignallerBuilder::new("logging");
        builder.take_callbacks().unwrap();
        assert!(builder.register(None).is_ok());
    }

    #[test]
    fn second_take_fails() {
        let mut builder = EventSignallerBuilder::<EnergySignallerEvent>::new("energy");
        builder.take_callbacks().unwrap();
        assert!(matches!(builder.take_callbacks(), Err(SignalError::BuiltTwice { .. })));
    }
}

#[cfg(test)]
mod neighbor_search {
    use ms_core::Step;

    use super::support::recorder;
    use crate::{NeighborSearchSignaller, Signaller};

    #[test]
    fn fires_on_multiples_and_init() {
        let (log, cb) = recorder();
        let mut ns = NeighborSearchSignaller::new(vec![cb], 4, Step(3));
        for step in 3..=12 {
            ns.signal(Step(step), 0.0);
        }
        assert_eq!(*log.borrow(), vec![3, 4, 8, 12]);
    }

    #[test]
    fn zero_interval_only_init() {
        let (log, cb) = recorder();
        let mut ns = NeighborSearchSignaller::new(vec![cb], 0, Step(0));
        for step in 0..5 {
            ns.signal(Step(step), 0.0);
        }
        assert_eq!(*log.borrow(), vec![0]);
    }
}

#[cfg(test)]
mod last_step {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::Step;

    use super::support::{recorder, StopAfter};
    use crate::{
        LastStepSignaller, NeverStop, SharedStopMonitor, SignalError, Signaller, SignallerClient,
    };

    fn never() -> SharedStopMonitor {
        Rc::new(RefCell::new(NeverStop))
    }

    #[test]
    fn setup_requires_ns_registration() {
        let mut last = LastStepSignaller::new(Vec::new(), 5, Step(0), never());
        assert!(matches!(last.setup(), Err(SignalError::MissingRegistration { .. })));

        let mut last = LastStepSignaller::new(Vec::new(), 5, Step(0), never());
        assert!(last.register_ns_callback().is_some());
        assert!(last.setup().is_ok());
    }

    #[test]
    fn fires_once_at_stop_step() {
        let (log, cb) = recorder();
        let mut last = LastStepSignaller::new(vec![cb], 5, Step(10), never());
        for step in 10..=15 {
            last.signal(Step(step), 0.0);
            last.signal(Step(step), 0.0);
        }
        assert_eq!(*log.borrow(), vec![15]);
        assert_eq!(last.signalled_step(), Some(Step(15)));
    }

    #[test]
    fn infinite_run_never_fires_without_stop() {
        let (log, cb) = recorder();
        let mut last = LastStepSignaller::new(vec![cb], -1, Step(0), never());
        for step in 0..1000 {
            last.signal(Step(step), 0.0);
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_monitor_ends_run_early() {
        let (log, cb) = recorder();
        let stop: SharedStopMonitor = Rc::new(RefCell::new(StopAfter(3)));
        let mut last = LastStepSignaller::new(vec![cb], 10, Step(0), stop);
        for step in 0..=10 {
            last.signal(Step(step), 0.0);
        }
        assert_eq!(*log.borrow(), vec![3]);
    }

    #[test]
    fn negative_start_without_ns_signal_is_not_an_ns_step() {
        struct StopOnNs;

        impl crate::StopMonitor for StopOnNs {
            fn stopping_after_current_step(&self, _step: Step, is_ns_step: bool) -> bool {
                is_ns_step
            }

            fn set_signal(&mut self, _step: Step, _is_ns_step: bool) {}
        }

        let (log, cb) = recorder();
        let stop: SharedStopMonitor = Rc::new(RefCell::new(StopOnNs));
        let mut last = LastStepSignaller::new(vec![cb], 5, Step(-3), stop);
        let mut ns = last.register_ns_callback().unwrap();
        for step in -3..=-1 {
            last.signal(Step(step), 0.0);
        }
        assert!(log.borrow().is_empty());

        ns(Step(0), 0.0);
        last.signal(Step(0), 0.0);
        assert_eq!(*log.borrow(), vec![0]);
    }

    #[test]
    fn earlier_step_after_rewind_fires_again() {
        let (log, cb) = recorder();
        let stop = Rc::new(RefCell::new(StopAfter(-1)));
        let shared: SharedStopMonitor = stop.clone();
        let mut last = LastStepSignaller::new(vec![cb], 4, Step(0), shared);
        for step in 0..=4 {
            last.signal(Step(step), 0.0);
        }
        // A stop raised for step 3 after the batch up to 4 was announced.
        stop.borrow_mut().0 = 3;
        last.signal(Step(3), 0.0);
        last.signal(Step(4), 0.0);
        assert_eq!(*log.borrow(), vec![4, 3]);
        assert_eq!(last.signalled_step(), Some(Step(3)));
    }
}

#[cfg(test)]
mod logging {
    use ms_core::Step;

    use super::support::recorder;
    use crate::{LoggingSignaller, Signaller, SignallerClient};

    #[test]
    fn fires_on_interval_init_and_last() {
        let (log, cb) = recorder();
        let mut logging = LoggingSignaller::new(vec![cb], 4, Step(1));
        let mut last_cb = logging.register_last_step_callback().unwrap();
        last_cb(Step(10), 0.0);
        for step in 1..=10 {
            logging.signal(Step(step), 0.0);
        }
        assert_eq!(*log.borrow(), vec![1, 4, 8, 10]);
    }
}

#[cfg(test)]
mod trajectory {
    use ms_core::Step;

    use super::support::recorder;
    use crate::{
        Signaller, SignallerClient, TrajectoryEvent, TrajectoryIntervals, TrajectorySignaller,
    };

    #[test]
    fn state_and_energy_steps() {
        let (state, state_cb) = recorder();
        let (energy, energy_cb) = recorder();
        let intervals = TrajectoryIntervals {
            nstxout: 3,
            nstvout: 0,
            nstfout: 0,
            nstenergy: 2,
            write_confout: true,
        };
        let mut traj = TrajectorySignaller::new(
            vec![
                (TrajectoryEvent::StateWritingStep, state_cb),
                (TrajectoryEvent::EnergyWritingStep, energy_cb),
            ],
            intervals,
        );
        let mut last_cb = traj.register_last_step_callback().unwrap();
        last_cb(Step(7), 0.0);
        for step in 1..=7 {
            traj.signal(Step(step), 0.0);
        }
        assert_eq!(*state.borrow(), vec![3, 6, 7]);
        assert_eq!(*energy.borrow(), vec![2, 4, 6, 7]);
    }

    #[test]
    fn no_confout_skips_final_state() {
        let (state, state_cb) = recorder();
        let intervals = TrajectoryIntervals { write_confout: false, ..Default::default() };
        let mut traj =
            TrajectorySignaller::new(vec![(TrajectoryEvent::StateWritingStep, state_cb)], intervals);
        traj.register_last_step_callback().unwrap()(Step(5), 0.0);
        traj.signal(Step(5), 0.0);
        assert!(state.borrow().is_empty());
    }
}

#[cfg(test)]
mod energy {
    use ms_core::Step;

    use super::support::recorder;
    use crate::{
        EnergySignaller, EnergySignallerEvent, Signaller, SignallerClient, TrajectoryEvent,
    };

    #[test]
    fn writing_and_logging_force_calculation() {
        let (energy, energy_cb) = recorder();
        let (virial, virial_cb) = recorder();
        let (fe, fe_cb) = recorder();
        let mut signaller = EnergySignaller::new(
            vec![
                (EnergySignallerEvent::EnergyCalculationStep, energy_cb),
                (EnergySignallerEvent::VirialCalculationStep, virial_cb),
                (EnergySignallerEvent::FreeEnergyCalculationStep, fe_cb),
            ],
            10,
            10,
            10,
        );
        assert!(signaller
            .register_trajectory_signaller_callback(TrajectoryEvent::StateWritingStep)
            .is_none());
        let mut writing = signaller
            .register_trajectory_signaller_callback(TrajectoryEvent::EnergyWritingStep)
            .unwrap();
        let mut logging = signaller.register_logging_callback().unwrap();

        writing(Step(3), 0.0);
        signaller.signal(Step(3), 0.0);
        logging(Step(5), 0.0);
        signaller.signal(Step(5), 0.0);
        signaller.signal(Step(7), 0.0);
        signaller.signal(Step(10), 0.0);

        assert_eq!(*energy.borrow(), vec![3, 5, 10]);
        assert_eq!(*virial.borrow(), vec![3, 5, 10]);
        // Logging alone does not force a free-energy calculation.
        assert_eq!(*fe.borrow(), vec![3, 10]);
    }

    #[test]
    fn negative_steps_do_not_fire_unrequested_calculations() {
        let (energy, energy_cb) = recorder();
        let (virial, virial_cb) = recorder();
        let (fe, fe_cb) = recorder();
        let mut signaller = EnergySignaller::new(
            vec![
                (EnergySignallerEvent::EnergyCalculationStep, energy_cb),
                (EnergySignallerEvent::VirialCalculationStep, virial_cb),
                (EnergySignallerEvent::FreeEnergyCalculationStep, fe_cb),
            ],
            0,
            0,
            0,
        );
        let _writing = signaller
            .register_trajectory_signaller_callback(TrajectoryEvent::EnergyWritingStep)
            .unwrap();
        let _logging = signaller.register_logging_callback().unwrap();

        for step in -3..=0 {
            signaller.signal(Step(step), 0.0);
        }
        assert!(energy.borrow().is_empty());
        assert!(virial.borrow().is_empty());
        assert!(fe.borrow().is_empty());
    }
}
