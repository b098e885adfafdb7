//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `energy.csv`
//! - `state.csv`

use std::fs::File;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use ms_element::stages::{EnergyFrame, StateFrame, TrajectorySink};
use ms_element::ElementResult;
use tracing::debug;

use crate::{EnergyRow, OutputResult, StateRow};

/// Writes trajectory frames to two CSV files.
pub struct CsvTrajectoryWriter {
    energy:   Writer<File>,
    state:    Writer<File>,
    finished: bool,
}

impl CsvTrajectoryWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut energy = open(&dir.join("energy.csv"))?;
        energy.write_record(EnergyRow::HEADER)?;

        let mut state = open(&dir.join("state.csv"))?;
        state.write_record(StateRow::HEADER)?;

        debug!(dir = %dir.display(), "csv trajectory files created");
        Ok(Self { energy, state, finished: false })
    }

    fn append_state(&mut self, frame: &StateFrame) -> OutputResult<()> {
        for row in StateRow::from_frame(frame) {
            self.state.serialize(row)?;
        }
        Ok(())
    }

    fn append_energy(&mut self, frame: &EnergyFrame) -> OutputResult<()> {
        self.energy.serialize(EnergyRow::from(frame))?;
        Ok(())
    }

    /// Flush both files.  Later calls do nothing.
    pub fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.energy.flush()?;
        self.state.flush()?;
        Ok(())
    }
}

// Headers are written explicitly so empty runs still get them.
fn open(path: &Path) -> OutputResult<Writer<File>> {
    Ok(WriterBuilder::new().has_headers(false).from_path(path)?)
}

impl TrajectorySink for CsvTrajectoryWriter {
    fn write_state(&mut self, frame: &StateFrame) -> ElementResult<()> {
        Ok(self.append_state(frame)?)
    }

    fn write_energy(&mut self, frame: &EnergyFrame) -> ElementResult<()> {
        Ok(self.append_energy(frame)?)
    }

    fn flush(&mut self) -> ElementResult<()> {
        Ok(self.finish()?)
    }
}
