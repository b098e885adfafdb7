//! Reference stages.
//!
//! Each stage decides per step whether it has work, and delegates the
//! numerics to a trait the surrounding engine implements
//! ([`ForceProvider`], [`IntegrationKernel`], [`TrajectorySink`]).

pub mod barostat;
pub mod energy;
pub mod force;
pub mod free_energy;
pub mod propagator;
pub mod state;
pub mod thermostat;
pub mod trajectory;

pub use barostat::{BerendsenBarostat, PressureCoupling};
pub use energy::{EnergyData, EnergyElement, SharedEnergy};
pub use force::{ForceElement, ForceFlags, ForceOutput, ForceProvider, ForceRequest};
pub use free_energy::{FreeEnergyPerturbationData, FreeEnergyPerturbationElement, SharedFreeEnergy};
pub use propagator::{IntegrationKernel, Propagator};
pub use state::{SharedState, StateElement, StatePropagatorData};
pub use thermostat::{TemperatureCoupling, VelocityScalingThermostat};
pub use trajectory::{EnergyFrame, FramesWritten, StateFrame, TrajectoryElement, TrajectorySink};

/// Boltzmann constant in kJ mol⁻¹ K⁻¹.
pub const BOLTZMANN: f64 = 0.008_314_462_618;

/// Converts kJ mol⁻¹ nm⁻³ to bar.
pub const PRESSURE_FACTOR: f64 = 16.605_390_666;
