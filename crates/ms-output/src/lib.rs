//! `ms-output` — trajectory output for the ms modular simulator.
//!
//! [`CsvTrajectoryWriter`] implements `ms_element::stages::TrajectorySink`
//! and creates two files in the output directory:
//!
//! | File          | One row per                        |
//! |---------------|------------------------------------|
//! | `energy.csv`  | energy-writing step                |
//! | `state.csv`   | atom, on every state-writing step  |
//!
//! # Usage
//!
//! ```rust,ignore
//! use ms_output::CsvTrajectoryWriter;
//!
//! let sink = CsvTrajectoryWriter::new(Path::new("./output"))?;
//! builder.set_trajectory_sink(sink);
//! ```

pub mod csv;
pub mod error;
pub mod row;


pub use crate::csv::CsvTrajectoryWriter;
pub use error::{OutputError, OutputResult};
pub use row::{EnergyRow, StateRow};
