use anyhow::Result;
use crossterm::{
    style::{self, Colorize, Styler},
    QueueableCommand,
};
use log::debug;
use std::{
    io::{stdout, Write},
    time::Instant,
};

use super::{ProgressStep, StepStatus};
use crate::services::{ProgressReporter, StepRenderer};

/// Draws steps on stdout. The child's output is passed through untouched
/// between a step's header and its status line.
#[derive(Debug, Default)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> TerminalReporter {
        TerminalReporter
    }
}

impl ProgressReporter for TerminalReporter {
    fn start_step(&mut self, label: &str) -> ProgressStep {
        if let Err(err) = print_header(label) {
            debug!("could not draw step header: {}", err);
        }

        let renderer = TerminalStep {
            started: Instant::now(),
        };
        ProgressStep::new(label, Box::new(renderer))
    }
}

fn print_header(label: &str) -> Result<()> {
    stdout()
        .queue(style::PrintStyledContent("==> ".cyan().bold()))?
        .queue(style::Print(label))?
        .queue(style::Print("\n"))?
        .flush()?;

    Ok(())
}

struct TerminalStep {
    started: Instant,
}

impl StepRenderer for TerminalStep {
    fn output(&mut self) -> Box<dyn Write + Send> {
        Box::new(stdout())
    }

    fn finish(&mut self, label: &str, status: StepStatus) -> Result<()> {
        let mut stdout = stdout();

        match status {
            StepStatus::Done => {
                let elapsed = self.started.elapsed();
                stdout
                    .queue(style::PrintStyledContent("done".green().bold()))?
                    .queue(style::Print(format!(
                        " {} ({:.1}s)\n",
                        label,
                        elapsed.as_secs_f32()
                    )))?;
            }
            StepStatus::Aborted => {
                stdout
                    .queue(style::PrintStyledContent("aborted".red().bold()))?
                    .queue(style::Print(format!(" {}\n", label)))?;
            }
            StepStatus::Running => (),
        }

        stdout.flush()?;
        Ok(())
    }
}
