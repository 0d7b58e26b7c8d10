use anyhow::Result as UiResult;
use serde_json::Value;
use std::io::Write;

use crate::{
    context::BuildContext,
    error::Result,
    models::{EnvSnapshot, InvocationPlan},
    progress::{ProgressStep, StepStatus},
};

/// What a host can do with a build adapter: hand it configuration, ask for
/// its plan, and run that plan.
pub trait Buildable: Sized {
    /// Name of the external tool, used in progress labels.
    const NAME: &'static str;

    type Output;

    fn validate(config: Value) -> Result<Self>;

    fn plan(&self, environment: &EnvSnapshot) -> Result<InvocationPlan>;

    fn run(
        &self,
        plan: &InvocationPlan,
        context: &BuildContext,
        output: &mut (dyn Write + Send),
    ) -> Result<Self::Output>;
}

pub trait ProgressReporter {
    fn start_step(&mut self, label: &str) -> ProgressStep;
}

/// The display side of a single progress step.
pub trait StepRenderer: Send {
    fn output(&mut self) -> Box<dyn Write + Send>;

    fn finish(&mut self, label: &str, status: StepStatus) -> UiResult<()>;
}
