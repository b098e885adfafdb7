//! Flat row types written to the CSV files.

use ms_element::stages::{EnergyFrame, StateFrame};
use serde::Serialize;

/// One energy frame.  `lambda` is empty outside free-energy runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyRow {
    pub step:        i64,
    pub time:        f64,
    pub kinetic:     f64,
    pub potential:   f64,
    pub total:       f64,
    pub temperature: f64,
    pub pressure:    f64,
    pub lambda:      Option<f64>,
    pub dhdl:        f64,
}

impl EnergyRow {
    pub const HEADER: [&'static str; 9] =
        ["step", "time", "kinetic", "potential", "total", "temperature", "pressure", "lambda", "dhdl"];
}

impl From<&EnergyFrame> for EnergyRow {
    fn from(frame: &EnergyFrame) -> Self {
        Self {
            step:        frame.step.0,
            time:        frame.time,
            kinetic:     frame.kinetic,
            potential:   frame.potential,
            total:       frame.total,
            temperature: frame.temperature,
            pressure:    frame.pressure,
            lambda:      frame.lambda,
            dhdl:        frame.dhdl,
        }
    }
}

/// One atom of a state frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateRow {
    pub step:     i64,
    pub time:     f64,
    pub is_final: u8,
    pub atom:     usize,
    pub x:        f64,
    pub y:        f64,
    pub z:        f64,
    pub vx:       f64,
    pub vy:       f64,
    pub vz:       f64,
}

impl StateRow {
    pub const HEADER: [&'static str; 10] =
        ["step", "time", "is_final", "atom", "x", "y", "z", "vx", "vy", "vz"];

    /// Split a frame into per-atom rows.
    pub fn from_frame(frame: &StateFrame) -> impl Iterator<Item = StateRow> + '_ {
        frame.positions.iter().zip(&frame.velocities).enumerate().map(move |(atom, (x, v))| StateRow {
            step: frame.step.0,
            time: frame.time,
            is_final: frame.is_final as u8,
            atom,
            x: x[0],
            y: x[1],
            z: x[2],
            vx: v[0],
            vy: v[1],
            vz: v[2],
        })
    }
}
