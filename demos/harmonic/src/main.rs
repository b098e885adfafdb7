//! harmonic: smallest driver for the ms modular simulator.
//!
//! Runs a few hundred argon-like atoms in a harmonic well with a Berendsen
//! thermostat, writing energies and the final configuration as CSV and a
//! JSON checkpoint next to them.
//!
//! ```text
//! harmonic [OUTPUT_DIR] [--config run.json] [--restart]
//! ```
//!
//! `RUST_LOG=debug` shows batch boundaries and checkpoint decisions.

mod physics;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ms_algorithm::SimulatorAlgorithmBuilder;
use ms_control::JsonCheckpointWriter;
use ms_core::RunConfig;
use ms_element::stages::{
    EnergyElement, ForceElement, Propagator, StateElement, StatePropagatorData, VelocityScalingThermostat,
};
use ms_element::PropagatorTag;
use ms_output::CsvTrajectoryWriter;

use physics::{HarmonicWell, Leapfrog};

// ── Constants ─────────────────────────────────────────────────────────────────

const ATOMS_PER_SIDE:  usize = 6;
const SPACING:         f64   = 0.4;  // nm
const MASS:            f64   = 39.948; // u
const SPRING:          f64   = 50.0; // kJ/mol/nm²
const REF_TEMPERATURE: f64   = 120.0; // K
const TAU_T:           f64   = 0.1;  // ps
const CHECKPOINT_FILE: &str  = "state.ckpt.json";

struct Args {
    output:  PathBuf,
    config:  Option<PathBuf>,
    restart: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args { output: PathBuf::from("./output"), config: None, restart: false };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--restart" => args.restart = true,
            "--config" => args.config = Some(it.next().context("--config needs a path")?.into()),
            other => args.output = PathBuf::from(other),
        }
    }
    Ok(args)
}

fn default_config() -> RunConfig {
    RunConfig {
        nsteps:        2_000,
        delta_t:       0.002,
        nstlist:       10,
        nstcalcenergy: 10,
        nstenergy:     50,
        nstlog:        500,
        nsttcouple:    10,
        verbose:       true,
        verbose_step_print_interval: 500,
        checkpoint_period_minutes: 0.0,
        seed:          42,
        ..RunConfig::default()
    }
}

fn lattice() -> StatePropagatorData {
    let side = ATOMS_PER_SIDE as f64 * SPACING;
    let offset = 0.5 * SPACING;
    let mut positions = Vec::with_capacity(ATOMS_PER_SIDE.pow(3));
    for i in 0..ATOMS_PER_SIDE {
        for j in 0..ATOMS_PER_SIDE {
            for k in 0..ATOMS_PER_SIDE {
                positions.push([
                    offset + i as f64 * SPACING,
                    offset + j as f64 * SPACING,
                    offset + k as f64 * SPACING,
                ]);
            }
        }
    }
    let masses = vec![MASS; positions.len()];
    StatePropagatorData::new(positions, masses, [side; 3])
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = parse_args()?;
    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    // 1. Configuration.
    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => default_config(),
    };
    info!(nsteps = config.nsteps, dt = config.delta_t, nstlist = config.nstlist, "run configuration");

    // 2. Initial state.
    let mut state = lattice();
    state.generate_velocities(REF_TEMPERATURE, config.seed);
    println!("Atoms: {}  |  Box: {:.2} nm  |  Steps: {}", state.num_atoms(), state.box_diag[0], config.nsteps);

    // 3. Elements, in call order.
    let tag = PropagatorTag::new("leapfrog");
    let checkpoint_path = args.output.join(CHECKPOINT_FILE);
    let mut builder = SimulatorAlgorithmBuilder::new(config, state)?;
    builder.add(ForceElement::builder(HarmonicWell { k: SPRING }))?;
    builder.add(VelocityScalingThermostat::builder(tag.clone(), REF_TEMPERATURE, TAU_T))?;
    builder.add(Propagator::builder(tag, Leapfrog))?;
    builder.add(StateElement::builder())?;
    builder.add(EnergyElement::builder())?;

    // 4. Collaborators.
    builder.set_trajectory_sink(CsvTrajectoryWriter::new(&args.output)?);
    if args.restart {
        let checkpoint = JsonCheckpointWriter::read(&checkpoint_path)?;
        println!("Continuing from step {}", checkpoint.step);
        builder.restart_from(checkpoint);
    }
    builder.set_checkpoint_writer(JsonCheckpointWriter::new(&checkpoint_path));
    let energy = builder.energy();

    // 5. Run.
    let mut algorithm = builder.build()?;
    let summary = algorithm.run()?;

    let energy = energy.borrow();
    println!();
    println!("Steps done:   {}", summary.steps_done);
    println!("Last step:    {}", summary.last_step);
    println!("Tasks run:    {}", summary.tasks_run);
    println!("Wall time:    {:.3?}", summary.wall_time);
    println!("Temperature:  {:.1} K", energy.temperature);
    println!("Total energy: {:.3} kJ/mol", energy.total());
    println!("Output:       {}", args.output.display());
    Ok(())
}
