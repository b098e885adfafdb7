//! The toy physics driven by the scheduler: a harmonic well and a leapfrog
//! integrator.

use ms_core::Time;
use ms_element::stages::{ForceOutput, ForceProvider, ForceRequest, IntegrationKernel, StatePropagatorData};
use ms_element::ElementResult;

/// Every atom is tied to the box centre by a spring of constant `k`.
pub struct HarmonicWell {
    pub k: f64,
}

impl ForceProvider for HarmonicWell {
    fn compute(&mut self, request: ForceRequest<'_>, forces: &mut [[f64; 3]]) -> ElementResult<ForceOutput> {
        let centre = request.box_diag.map(|b| 0.5 * b);
        let mut output = ForceOutput::default();
        for (x, f) in request.positions.iter().zip(forces.iter_mut()) {
            for d in 0..3 {
                let dx = x[d] - centre[d];
                f[d] = -self.k * dx;
                output.potential += 0.5 * self.k * dx * dx;
                output.virial += -0.5 * dx * f[d];
            }
        }
        if !request.flags.compute_energy {
            output.potential = 0.0;
        }
        Ok(output)
    }
}

/// Leapfrog: kick with the current forces, scale, then drift.
pub struct Leapfrog;

impl IntegrationKernel for Leapfrog {
    fn integrate(&mut self, state: &mut StatePropagatorData, dt: Time, velocity_scaling: f64) -> ElementResult<()> {
        let StatePropagatorData { positions, velocities, forces, masses, .. } = state;
        for (((x, v), f), m) in positions.iter_mut().zip(velocities.iter_mut()).zip(forces.iter()).zip(masses.iter()) {
            for d in 0..3 {
                v[d] = (v[d] + f[d] / m * dt) * velocity_scaling;
                x[d] += v[d] * dt;
            }
        }
        Ok(())
    }
}
