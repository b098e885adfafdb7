//! Assembling a [`SimulatorAlgorithm`].

use std::cell::RefCell;
use std::rc::Rc;

use ms_control::{
    Checkpoint, CheckpointHandler, CheckpointHelper, CheckpointWriter,
    LoadBalanceHelper, LoadBalancer, Partitioner, RepartitionHelper, ResetHandler, StopHandler,
    StopRequest,
};
use ms_core::{ElementId, RunConfig};
use ms_element::stages::{
    EnergyData, FreeEnergyPerturbationData, FreeEnergyPerturbationElement, SharedEnergy,
    SharedFreeEnergy, SharedState, StatePropagatorData, TrajectoryElement, TrajectorySink,
};
use ms_element::{
    dedup_ids, element_handle, BuildContext, BuildElement, ElementHandle, ElementStore,
    ServiceKind, ServiceRegistry, Wiring,
};
use ms_signal::SharedStopMonitor;
use tracing::info;

use crate::algorithm::{AlgorithmParts, SharedBatchHelper, SharedPersistence, SharedResetMonitor};
use crate::signallers::SignallerBuilders;
use crate::step_facts::{SignalHelper, StepFacts};
use crate::{AlgorithmError, AlgorithmResult, SimulatorAlgorithm};

/// Collects elements and collaborators, wires them, and builds exactly one
/// [`SimulatorAlgorithm`].
///
/// ```text
/// let mut builder = SimulatorAlgorithmBuilder::new(config, state)?;
/// builder.add(ForceElement::builder(provider))?;
/// builder.add(Propagator::builder(tag, kernel))?;
/// builder.add(EnergyElement::builder())?;
/// let mut algorithm = builder.build()?;
/// algorithm.run()?;
/// ```
///
/// The final call list is: checkpoint helper (if checkpointing), the
/// free-energy element (if a free-energy run), the added elements in order,
/// and the trajectory element (if a sink was given).
pub struct SimulatorAlgorithmBuilder {
    config:        RunConfig,
    state:         SharedState,
    energy:        SharedEnergy,
    free_energy:   Option<SharedFreeEnergy>,
    store:         ElementStore,
    registry:      ServiceRegistry,
    wiring:        Wiring,
    call_list:     Vec<ElementId>,
    stop_request:  StopRequest,
    stop_monitor:  Option<SharedStopMonitor>,
    reset_monitor: Option<SharedResetMonitor>,
    checkpointer:  Option<Box<dyn CheckpointWriter>>,
    restart:       Option<Checkpoint>,
    partitioner:   Option<Box<dyn Partitioner>>,
    balancer:      Option<Box<dyn LoadBalancer>>,
    sink:          Option<Box<dyn TrajectorySink>>,
    built:         bool,
}

impl SimulatorAlgorithmBuilder {
    pub fn new(config: RunConfig, state: StatePropagatorData) -> AlgorithmResult<Self> {
        config.validate()?;
        let free_energy = config.free_energy.then(|| {
            Rc::new(RefCell::new(FreeEnergyPerturbationData::new(
                config.init_lambda,
                config.delta_lambda,
                config.init_step(),
            )))
        });
        Ok(Self {
            state: Rc::new(RefCell::new(state)),
            energy: Rc::new(RefCell::new(EnergyData::default())),
            free_energy,
            config,
            store: ElementStore::new(),
            registry: ServiceRegistry::new(),
            wiring: Wiring::new(),
            call_list: Vec::new(),
            stop_request: StopRequest::new(),
            stop_monitor: None,
            reset_monitor: None,
            checkpointer: None,
            restart: None,
            partitioner: None,
            balancer: None,
            sink: None,
            built: false,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> SharedState {
        Rc::clone(&self.state)
    }

    pub fn energy(&self) -> SharedEnergy {
        Rc::clone(&self.energy)
    }

    /// Build an element into the call list.  Returns its id in the store.
    pub fn add<B: BuildElement>(&mut self, builder: B) -> AlgorithmResult<ElementId> {
        if self.built {
            return Err(AlgorithmError::AddAfterBuild);
        }
        let mut ctx = BuildContext::new(
            &self.config,
            &mut self.store,
            &mut self.registry,
            &mut self.wiring,
            &self.state,
            &self.energy,
            self.free_energy.as_ref(),
        );
        let id = builder.build(&mut ctx)?;
        if !self.store.contains(id) {
            return Err(AlgorithmError::ElementNotFound(id));
        }
        self.call_list.push(id);
        Ok(id)
    }

    // ── Collaborators ──

    /// Flag the default stop handler watches.  Clone it before building to
    /// request a stop from elsewhere.
    pub fn stop_request(&self) -> StopRequest {
        self.stop_request.clone()
    }

    /// Replace the default [`StopHandler`].
    pub fn set_stop_monitor(&mut self, monitor: SharedStopMonitor) -> &mut Self {
        self.stop_monitor = Some(monitor);
        self
    }

    /// Replace the default [`ResetHandler`].
    pub fn set_reset_monitor(&mut self, monitor: SharedResetMonitor) -> &mut Self {
        self.reset_monitor = Some(monitor);
        self
    }

    /// Enable checkpointing through `writer`.
    pub fn set_checkpoint_writer(&mut self, writer: impl CheckpointWriter + 'static) -> &mut Self {
        self.checkpointer = Some(Box::new(writer));
        self
    }

    /// Continue from `checkpoint`: the run starts at its step and every
    /// checkpoint client restores its data before setup.
    pub fn restart_from(&mut self, checkpoint: Checkpoint) -> &mut Self {
        self.restart = Some(checkpoint);
        self
    }

    pub fn set_partitioner(&mut self, partitioner: impl Partitioner + 'static) -> &mut Self {
        self.partitioner = Some(Box::new(partitioner));
        self
    }

    pub fn set_load_balancer(&mut self, balancer: impl LoadBalancer + 'static) -> &mut Self {
        self.balancer = Some(Box::new(balancer));
        self
    }

    pub fn set_trajectory_sink(&mut self, sink: impl TrajectorySink + 'static) -> &mut Self {
        self.sink = Some(Box::new(sink));
        self
    }

    // ── Build ──

    /// Wire everything and return the set-up algorithm.  Fails on any
    /// later call.
    pub fn build(&mut self) -> AlgorithmResult<SimulatorAlgorithm> {
        if self.built {
            return Err(AlgorithmError::AlreadyBuilt);
        }
        self.built = true;

        self.wiring.connect_all().map_err(|unmatched| AlgorithmError::UnmatchedRegistration {
            controller: unmatched.controller,
            target:     unmatched.target,
        })?;

        let mut config = self.config.clone();
        if let Some(checkpoint) = &self.restart {
            let last_step = config.last_step();
            config.init_step = checkpoint.step.0;
            if config.nsteps >= 0 {
                config.nsteps = last_step.since(checkpoint.step).max(0);
            }
            info!(step = %checkpoint.step, nsteps = config.nsteps, "continuing from checkpoint");
        }
        let init_step = config.init_step();
        let mut store = std::mem::take(&mut self.store);

        // ── Call list ──

        let free_energy_id = match &self.free_energy {
            Some(data) => Some(self.registry.get_or_insert_with::<AlgorithmError>(
                ServiceKind::FreeEnergyPerturbation,
                || Ok(store.store(element_handle(FreeEnergyPerturbationElement::new(Rc::clone(data))))),
            )?),
            None => None,
        };
        let mut inner: Vec<ElementId> = free_energy_id.into_iter().collect();
        inner.extend(self.call_list.iter().filter(|id| Some(**id) != free_energy_id));

        let checkpoint_helper = self.checkpointer.take().map(|writer| {
            let clients = handles(&store, &dedup_ids(&inner))
                .into_iter()
                .filter(|handle| handle.borrow().checkpoint_key().is_some())
                .collect();
            Rc::new(RefCell::new(CheckpointHelper::new(
                CheckpointHandler::new(config.checkpoint_period_minutes, config.write_final_checkpoint),
                writer,
                clients,
                init_step,
            )))
        });

        let trajectory_id = self.sink.take().map(|sink| {
            let mut trajectory = TrajectoryElement::new(sink);
            for handle in handles(&store, &dedup_ids(&inner)) {
                trajectory.register_writer_client(&mut *handle.borrow_mut());
            }
            store.store(element_handle(trajectory))
        });

        let mut call_list = Vec::with_capacity(inner.len() + 2);
        if let Some(helper) = &checkpoint_helper {
            let handle: ElementHandle = helper.clone();
            call_list.push(store.store(handle));
        }
        call_list.extend(inner);
        call_list.extend(trajectory_id);
        let setup_list = dedup_ids(&call_list);

        // ── Helpers and signallers ──

        let facts = Rc::new(StepFacts::new());
        let repartition = self.partitioner.take().map(|partitioner| {
            Rc::new(RefCell::new(RepartitionHelper::new(partitioner, Rc::clone(&self.state), init_step)))
        });
        let load_balance = self.balancer.take().map(LoadBalanceHelper::new);

        let stop = self.stop_monitor.take().unwrap_or_else(|| -> SharedStopMonitor {
            Rc::new(RefCell::new(StopHandler::new(
                self.stop_request.clone(),
                config.nstlist,
                config.max_hours,
            )))
        });
        let reset = self.reset_monitor.take().or_else(|| {
            config.reset_halfway.then(|| -> SharedResetMonitor {
                Rc::new(RefCell::new(ResetHandler::new(true, config.nsteps, config.max_hours)))
            })
        });

        let mut signaller_builders = SignallerBuilders::new();
        signaller_builders.register(&mut SignalHelper::new(Rc::clone(&facts)))?;
        if let Some(repartition) = &repartition {
            signaller_builders.register(&mut *repartition.borrow_mut())?;
        }
        for handle in handles(&store, &setup_list) {
            signaller_builders.register(&mut *handle.borrow_mut())?;
        }
        let signallers = signaller_builders.build(&config, init_step, Rc::clone(&stop))?;

        let persistence = checkpoint_helper.map(|helper| -> SharedPersistence { helper });
        let repartition = repartition.map(|helper| -> SharedBatchHelper { helper });
        let load_balance =
            load_balance.map(|helper| -> SharedBatchHelper { Rc::new(RefCell::new(helper)) });

        let mut algorithm = SimulatorAlgorithm::from_parts(AlgorithmParts {
            clock: config.make_clock(),
            init_step,
            verbose: config.verbose.then_some(config.verbose_step_print_interval),
            store,
            call_list,
            setup_list,
            signallers,
            facts,
            stop,
            reset,
            persistence,
            repartition,
            load_balance,
            restart: self.restart.take(),
        });
        algorithm.setup()?;
        Ok(algorithm)
    }
}

fn handles(store: &ElementStore, ids: &[ElementId]) -> Vec<ElementHandle> {
    ids.iter().filter_map(|id| store.get(*id).cloned()).collect()
}
