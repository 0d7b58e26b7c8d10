use log::{debug, warn};
use std::fmt;

use crate::{
    context::BuildContext,
    error::{Error, Result},
    services::{Buildable, ProgressReporter},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Initializing,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "idle",
            BuildState::Initializing => "initializing",
            BuildState::Executing => "executing",
            BuildState::Completed => "completed",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one build adapter through planning and execution, mirroring each
/// stage as a progress step.
pub struct Controller<B> {
    builder: B,
}

impl<B: Buildable> Controller<B> {
    pub fn init(builder: B) -> Controller<B> {
        debug!("build state: {}", BuildState::Idle);
        Controller { builder }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Runs a single build. Errors from the builder are returned as they
    /// are; the step that was open when they happened ends up aborted.
    pub fn build(
        &self,
        context: &BuildContext,
        ui: &mut dyn ProgressReporter,
    ) -> Result<B::Output> {
        if let Some(reason) = context.interruption() {
            return Err(failed(Error::Cancelled {
                command: B::NAME.to_owned(),
                reason,
            }));
        }

        debug!("build state: {}", BuildState::Initializing);
        let mut init_step = ui.start_step(&format!("Initializing {} build context", B::NAME));
        let plan = self
            .builder
            .plan(context.environment())
            .map_err(failed)?;
        init_step.done();

        debug!("build state: {}", BuildState::Executing);
        let mut exec_step = ui.start_step(&format!("Executing command: {}", plan.command_line()));
        let mut sink = exec_step.sink();
        let output = self
            .builder
            .run(&plan, context, &mut *sink)
            .map_err(failed)?;
        exec_step.done();

        debug!("build state: {}", BuildState::Completed);
        Ok(output)
    }
}

fn failed<E: fmt::Display>(err: E) -> E {
    warn!("build state: {} ({})", BuildState::Failed, err);
    err
}
