//! Assembling the signaller chain.

use ms_core::{RunConfig, Step};
use ms_signal::{
    EnergySignaller, EnergySignallerEvent, EventSignallerBuilder, LastStepSignaller,
    LoggingSignaller, NeighborSearchSignaller, SharedStopMonitor, SignalResult, Signaller,
    SignallerBuilder, SignallerClient, TrajectoryEvent, TrajectoryIntervals, TrajectorySignaller,
};

/// Callback collectors for the five signallers.
pub(crate) struct SignallerBuilders {
    ns:         SignallerBuilder,
    last_step:  SignallerBuilder,
    logging:    SignallerBuilder,
    energy:     EventSignallerBuilder<EnergySignallerEvent>,
    trajectory: EventSignallerBuilder<TrajectoryEvent>,
}

impl SignallerBuilders {
    pub(crate) fn new() -> Self {
        Self {
            ns:         SignallerBuilder::new("neighbor search"),
            last_step:  SignallerBuilder::new("last step"),
            logging:    SignallerBuilder::new("logging"),
            energy:     EventSignallerBuilder::new("energy"),
            trajectory: EventSignallerBuilder::new("trajectory"),
        }
    }

    /// Offer `client` to every signaller.  Must be called once per client.
    pub(crate) fn register<C: SignallerClient + ?Sized>(&mut self, client: &mut C) -> SignalResult<()> {
        self.ns.register(client.register_ns_callback())?;
        self.last_step.register(client.register_last_step_callback())?;
        self.logging.register(client.register_logging_callback())?;
        for event in EnergySignallerEvent::ALL {
            self.energy.register(event, client.register_energy_callback(event))?;
        }
        for event in TrajectoryEvent::ALL {
            self.trajectory.register(event, client.register_trajectory_signaller_callback(event))?;
        }
        Ok(())
    }

    /// Build the signallers, each one registering with those it depends on,
    /// and return them in call order.
    pub(crate) fn build(
        mut self,
        config:    &RunConfig,
        init_step: Step,
        stop:      SharedStopMonitor,
    ) -> SignalResult<Vec<Box<dyn Signaller>>> {
        let mut energy = EnergySignaller::new(
            self.energy.take_callbacks()?,
            config.nstcalcenergy,
            config.nstpcouple,
            config.nstdhdl,
        );
        self.register(&mut energy)?;

        let mut trajectory = TrajectorySignaller::new(
            self.trajectory.take_callbacks()?,
            TrajectoryIntervals {
                nstxout:       config.nstxout,
                nstvout:       config.nstvout,
                nstfout:       config.nstfout,
                nstenergy:     config.nstenergy,
                write_confout: config.write_confout,
            },
        );
        self.register(&mut trajectory)?;

        let mut logging = LoggingSignaller::new(self.logging.take_callbacks()?, config.nstlog, init_step);
        self.register(&mut logging)?;

        let mut last_step =
            LastStepSignaller::new(self.last_step.take_callbacks()?, config.nsteps, init_step, stop);
        self.register(&mut last_step)?;

        let ns = NeighborSearchSignaller::new(self.ns.take_callbacks()?, config.nstlist, init_step);

        let build_order: Vec<Box<dyn Signaller>> = vec![
            Box::new(energy),
            Box::new(trajectory),
            Box::new(logging),
            Box::new(last_step),
            Box::new(ns),
        ];
        Ok(into_call_order(build_order))
    }
}

/// Signallers are built dependents-first; they must be called in the
/// opposite order.
pub(crate) fn into_call_order(mut build_order: Vec<Box<dyn Signaller>>) -> Vec<Box<dyn Signaller>> {
    build_order.reverse();
    build_order
}
