use log::warn;
use std::{fmt, io::Write};

use crate::services::StepRenderer;

mod memory;
mod terminal;

pub use memory::{MemoryReporter, StepRecord};
pub use terminal::TerminalReporter;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    Done,
    Aborted,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Running => f.write_str("running"),
            StepStatus::Done => f.write_str("done"),
            StepStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// One unit of user visible progress.
///
/// A step leaves `Running` exactly once. Later calls to `done` or `abort`
/// are ignored, and a step dropped while still running is aborted.
pub struct ProgressStep {
    label: String,
    status: StepStatus,
    renderer: Box<dyn StepRenderer>,
}

impl ProgressStep {
    pub fn new<L: Into<String>>(label: L, renderer: Box<dyn StepRenderer>) -> ProgressStep {
        ProgressStep {
            label: label.into(),
            status: StepStatus::Running,
            renderer,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Where live output for this step goes.
    pub fn sink(&mut self) -> Box<dyn Write + Send> {
        self.renderer.output()
    }

    pub fn done(&mut self) {
        self.close(StepStatus::Done);
    }

    pub fn abort(&mut self) {
        self.close(StepStatus::Aborted);
    }

    fn close(&mut self, status: StepStatus) {
        if self.status != StepStatus::Running {
            return;
        }
        self.status = status;

        if let Err(err) = self.renderer.finish(&self.label, status) {
            warn!("could not render step {:?} as {}: {}", self.label, status, err);
        }
    }
}

impl fmt::Debug for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressStep")
            .field("label", &self.label)
            .field("status", &self.status)
            .finish()
    }
}

impl Drop for ProgressStep {
    fn drop(&mut self) {
        self.abort();
    }
}
