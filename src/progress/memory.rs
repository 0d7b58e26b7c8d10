use anyhow::Result;
use std::{
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{ProgressStep, StepStatus};
use crate::services::{ProgressReporter, StepRenderer};

/// Everything a `MemoryReporter` saw of one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRecord {
    pub label: String,
    pub status: StepStatus,
    pub output: Vec<u8>,
    /// How many times the step was closed. Should never exceed one.
    pub finished: usize,
}

impl StepRecord {
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

type Records = Arc<Mutex<Vec<StepRecord>>>;

fn lock(records: &Records) -> MutexGuard<'_, Vec<StepRecord>> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps steps and their output in memory instead of drawing them.
#[derive(Clone, Debug, Default)]
pub struct MemoryReporter {
    records: Records,
}

impl MemoryReporter {
    pub fn new() -> MemoryReporter {
        Default::default()
    }

    pub fn steps(&self) -> Vec<StepRecord> {
        lock(&self.records).clone()
    }
}

impl ProgressReporter for MemoryReporter {
    fn start_step(&mut self, label: &str) -> ProgressStep {
        let index = {
            let mut records = lock(&self.records);
            records.push(StepRecord {
                label: label.to_owned(),
                status: StepStatus::Running,
                output: Vec::new(),
                finished: 0,
            });
            records.len() - 1
        };

        let renderer = MemoryStep {
            records: self.records.clone(),
            index,
        };
        ProgressStep::new(label, Box::new(renderer))
    }
}

struct MemoryStep {
    records: Records,
    index: usize,
}

impl StepRenderer for MemoryStep {
    fn output(&mut self) -> Box<dyn Write + Send> {
        Box::new(MemoryStep {
            records: self.records.clone(),
            index: self.index,
        })
    }

    fn finish(&mut self, _label: &str, status: StepStatus) -> Result<()> {
        let mut records = lock(&self.records);
        let record = &mut records[self.index];
        record.status = status;
        record.finished += 1;
        Ok(())
    }
}

impl Write for MemoryStep {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.records)[self.index].output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
