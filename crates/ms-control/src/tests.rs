//! Unit tests for the orchestration helpers.

#[cfg(test)]
mod stop {
    use ms_core::Step;
    use ms_signal::StopMonitor;

    use crate::{StopHandler, StopRequest, StopSignal};

    #[test]
    fn requests_escalate_and_saturate() {
        let request = StopRequest::new();
        assert_eq!(request.current(), StopSignal::None);
        assert_eq!(request.request(), StopSignal::StopAtNextNsStep);
        assert_eq!(request.request(), StopSignal::StopImmediately);
        assert_eq!(request.request(), StopSignal::StopImmediately);
    }

    #[test]
    fn request_takes_effect_after_set_signal() {
        let request = StopRequest::new();
        let mut handler = StopHandler::new(request.clone(), 10, None);
        request.request();
        assert!(!handler.stopping_after_current_step(Step(10), true));

        handler.set_signal(Step(3), false);
        assert!(!handler.stopping_after_current_step(Step(4), false));
        assert!(handler.stopping_after_current_step(Step(10), true));

        request.request();
        handler.set_signal(Step(4), false);
        assert!(handler.stopping_after_current_step(Step(5), false));
    }

    #[test]
    fn next_ns_stop_on_any_step_without_repartitioning() {
        let request = StopRequest::new();
        let mut handler = StopHandler::new(request.clone(), 0, None);
        request.request();
        handler.set_signal(Step(0), true);
        assert!(handler.stopping_after_current_step(Step(1), false));
    }

    #[test]
    fn exhausted_wall_time_requests_stop() {
        let mut handler = StopHandler::new(StopRequest::new(), 10, Some(1e-12));
        handler.set_signal(Step(0), true);
        assert_eq!(handler.signal(), StopSignal::StopAtNextNsStep);
    }
}

#[cfg(test)]
mod reset {
    use ms_core::Step;

    use crate::{ResetHandler, ResetMonitor, WallTimeAccounting};

    #[test]
    fn resets_once_halfway() {
        let mut walltime = WallTimeAccounting::start();
        let mut handler = ResetHandler::new(true, 10, None);
        let resets: Vec<i64> = (0..=10)
            .filter(|&s| {
                handler.set_signal(&walltime);
                walltime.end_step();
                handler.reset_counters(Step(s), s, &mut walltime)
            })
            .collect();
        assert_eq!(resets, vec![5]);
        assert_eq!(walltime.reset_at(), Some(Step(5)));
        assert_eq!(walltime.steps_done(), 11);
        assert_eq!(walltime.steps_counted(), 5);
    }

    #[test]
    fn disabled_never_resets() {
        let mut walltime = WallTimeAccounting::start();
        let mut handler = ResetHandler::new(false, 10, None);
        assert!(!handler.reset_counters(Step(5), 5, &mut walltime));
        assert!(!handler.has_reset());
    }
}

#[cfg(test)]
mod walltime {
    use crate::WallTimeAccounting;

    #[test]
    fn no_mean_before_the_first_step() {
        let mut walltime = WallTimeAccounting::start();
        assert_eq!(walltime.mean_step_time(), None);
        walltime.start_step();
        walltime.end_step();
        assert!(walltime.mean_step_time().is_some());
    }

    #[test]
    fn mean_survives_step_counts_beyond_u32() {
        let mut walltime = WallTimeAccounting::start();
        walltime.set_steps_counted(1 << 32);
        let mean = walltime.mean_step_time().unwrap();
        assert!(mean <= walltime.elapsed());
        assert!(walltime.remaining(10).is_some());
    }
}

#[cfg(test)]
mod checkpoint {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::{Step, Time};
    use ms_element::{element_handle, ElementResult, Registrar, SimulatorElement};
    use ms_signal::SignallerClient;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::checkpoint::PersistenceScheduler;
    use crate::{
        Checkpoint, CheckpointHandler, CheckpointHelper, CheckpointWriter, ControlResult,
        JsonCheckpointWriter,
    };

    struct Counter(i64);

    impl SignallerClient for Counter {}

    impl SimulatorElement for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn schedule_task(&mut self, _step: Step, _time: Time, _registrar: &mut Registrar<'_>) {}

        fn checkpoint_key(&self) -> Option<&'static str> {
            Some("counter")
        }

        fn write_checkpoint(&self) -> ElementResult<Value> {
            Ok(json!(self.0))
        }
    }

    #[derive(Default, Clone)]
    struct Collect(Rc<RefCell<Vec<Checkpoint>>>);

    impl CheckpointWriter for Collect {
        fn write(&mut self, checkpoint: &Checkpoint) -> ControlResult<()> {
            self.0.borrow_mut().push(checkpoint.clone());
            Ok(())
        }
    }

    #[test]
    fn handler_periods() {
        let mut every = CheckpointHandler::new(0.0, false);
        assert!(!every.decide(true, true, false), "never on the first step");
        assert!(every.decide(true, false, false));
        assert!(!every.decide(false, false, false));

        let mut never = CheckpointHandler::new(-1.0, true);
        assert!(!never.decide(true, false, false));
        assert!(never.decide(false, false, true), "final checkpoint still written");

        let mut timed = CheckpointHandler::new(60.0, false);
        timed.set_signal();
        assert!(!timed.decide(true, false, false), "period not elapsed yet");
    }

    #[test]
    fn helper_collects_client_data() {
        let collect = Collect::default();
        let client = element_handle(Counter(41));
        let mut helper = CheckpointHelper::new(
            CheckpointHandler::new(0.0, true),
            Box::new(collect.clone()),
            vec![client],
            Step(0),
        );
        let mut last = helper.register_last_step_callback().unwrap();
        last(Step(4), 4.0);

        helper.maybe_persist(Step(0), 0.0).unwrap();
        helper.maybe_persist(Step(3), 3.0).unwrap();
        assert_eq!(collect.0.borrow().len(), 1);
        assert_eq!(collect.0.borrow()[0].step, Step(3));
        assert_eq!(collect.0.borrow()[0].get("counter"), Some(&json!(41)));

        // The last step is written by the helper's own task, not per batch.
        helper.maybe_persist(Step(4), 4.0).unwrap();
        assert_eq!(collect.0.borrow().len(), 1);
        let mut tasks = Vec::new();
        helper.schedule_task(Step(4), 4.0, &mut Registrar::new(&mut tasks, Step(4), "checkpoint helper"));
        assert_eq!(tasks.len(), 1);
        tasks[0].run().unwrap();
        assert_eq!(collect.0.borrow().len(), 2);
        assert_eq!(helper.checkpoints_written(), 2);
    }

    #[test]
    fn json_writer_replaces_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.cpt.json");
        let mut writer = JsonCheckpointWriter::new(&path);

        let mut checkpoint = Checkpoint { step: Step(10), time: 0.5, elements: Default::default() };
        checkpoint.elements.insert("counter".into(), json!(1));
        writer.write(&checkpoint).unwrap();
        checkpoint.step = Step(20);
        writer.write(&checkpoint).unwrap();

        let read = JsonCheckpointWriter::read(&path).unwrap();
        assert_eq!(read, checkpoint);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temporary file must be renamed away");
    }

    #[test]
    fn reading_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let err = JsonCheckpointWriter::read(dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}

#[cfg(test)]
mod balance {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ms_core::{Step, Time};
    use ms_element::stages::StatePropagatorData;
    use ms_signal::SignallerClient;

    use crate::{BatchHelper, ControlResult, LoadBalanceHelper, LoadBalancer, Partitioner, RepartitionHelper};

    struct Log(Rc<RefCell<Vec<i64>>>);

    impl Partitioner for Log {
        fn partition(&mut self, step: Step, _state: &mut StatePropagatorData) -> ControlResult<()> {
            self.0.borrow_mut().push(step.0);
            Ok(())
        }
    }

    #[test]
    fn repartitions_after_each_boundary() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let state = Rc::new(RefCell::new(StatePropagatorData::new(vec![[0.0; 3]], vec![1.0], [1.0; 3])));
        let mut helper = RepartitionHelper::new(Box::new(Log(Rc::clone(&log))), state, Step(0));
        let mut ns = helper.register_ns_callback().unwrap();

        helper.setup().unwrap();
        ns(Step(0), 0.0);
        helper.run(Step(0), 0.0).unwrap();
        helper.run(Step(1), 1.0).unwrap();
        ns(Step(2), 2.0);
        helper.run(Step(3), 3.0).unwrap();
        ns(Step(4), 4.0);
        helper.run(Step(3), 3.0).unwrap();

        assert_eq!(*log.borrow(), vec![0, 1, 3]);
        assert_eq!(helper.partitions(), 3);
    }

    #[test]
    fn batch_starting_on_a_boundary_still_repartitions() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let state = Rc::new(RefCell::new(StatePropagatorData::new(vec![[0.0; 3]], vec![1.0], [1.0; 3])));
        let mut helper = RepartitionHelper::new(Box::new(Log(Rc::clone(&log))), state, Step(0));
        let mut ns = helper.register_ns_callback().unwrap();
        helper.setup().unwrap();

        // Every step is a boundary; each batch start is signalled before `run`.
        for step in 0..4 {
            ns(Step(step), 0.0);
            ns(Step(step), 0.0);
            helper.run(Step(step), 0.0).unwrap();
        }
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    struct Balancer {
        active_for: usize,
    }

    impl LoadBalancer for Balancer {
        fn is_active(&self) -> bool {
            self.active_for > 0
        }

        fn balance(&mut self, _step: Step, _time: Time) -> ControlResult<()> {
            self.active_for -= 1;
            Ok(())
        }

        fn is_printing(&self) -> bool {
            self.active_for > 0
        }
    }

    #[test]
    fn balancer_runs_while_active() {
        let mut helper = LoadBalanceHelper::new(Box::new(Balancer { active_for: 2 }));
        assert!(helper.is_printing());
        for step in 0..5 {
            helper.run(Step(step), 0.0).unwrap();
        }
        assert_eq!(helper.runs(), 2);
        assert!(!helper.is_printing());
    }
}
