//! Deterministic per-atom RNG.
//!
//! Each atom gets its own independent `SmallRng` seeded by:
//!
//!   seed = run_seed XOR (atom_id * MIXING_CONSTANT)
//!
//! so initial velocities do not depend on how atoms are distributed over
//! cooperating processes: every process draws the same value for the same
//! atom regardless of which subset it owns.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::AtomId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

pub struct AtomRng(SmallRng);

impl AtomRng {
    pub fn new(run_seed: u64, atom: AtomId) -> Self {
        let seed = run_seed ^ u64::from(atom.0).wrapping_mul(MIXING_CONSTANT);
        AtomRng(SmallRng::seed_from_u64(seed))
    }

    /// Standard normal sample (Box–Muller).
    pub fn gaussian(&mut self) -> f64 {
        // gen() is in [0, 1); keep the log argument away from zero.
        let u1: f64 = 1.0 - self.0.r#gen::<f64>();
        let u2: f64 = self.0.r#gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}
