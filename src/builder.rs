use serde_json::Value;
use std::io::Write;

use crate::{
    backends::ProcessRunner,
    context::BuildContext,
    error::Result,
    frontends,
    models::{BuildConfig, BuildResult, EnvSnapshot, InvocationPlan},
    planner::CommandPlanner,
    services::Buildable,
};

/// Builds or pushes one dobi resource.
#[derive(Clone, Debug)]
pub struct DobiBuilder {
    config: BuildConfig,
    planner: CommandPlanner,
    runner: ProcessRunner,
}

impl DobiBuilder {
    pub fn new(config: BuildConfig) -> DobiBuilder {
        DobiBuilder {
            config,
            planner: CommandPlanner::default(),
            runner: ProcessRunner::new(),
        }
    }

    /// Runs `program` instead of the `dobi` found on `PATH`.
    pub fn with_program<P: Into<String>>(mut self, program: P) -> DobiBuilder {
        self.planner = CommandPlanner::new(program);
        self
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> DobiBuilder {
        self.runner = runner;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }
}

impl Buildable for DobiBuilder {
    const NAME: &'static str = "dobi";

    type Output = BuildResult;

    fn validate(config: Value) -> Result<Self> {
        frontends::decode(config).map(DobiBuilder::new)
    }

    fn plan(&self, environment: &EnvSnapshot) -> Result<InvocationPlan> {
        self.planner.plan(&self.config, environment)
    }

    fn run(
        &self,
        plan: &InvocationPlan,
        context: &BuildContext,
        output: &mut (dyn Write + Send),
    ) -> Result<BuildResult> {
        self.runner.run(plan, context, output)?;
        Ok(BuildResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn validate_rejects_empty_target() {
        let err = DobiBuilder::validate(json!({ "image": "", "push": false })).unwrap_err();

        assert!(err.to_string().contains("target"), "{}", err);
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "target"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn plan_uses_configured_program() {
        let builder = DobiBuilder::validate(json!({ "image": "myapp", "push": true }))
            .unwrap()
            .with_program("/usr/local/bin/dobi");
        let plan = builder.plan(&EnvSnapshot::default()).unwrap();

        assert_eq!(plan.program, "/usr/local/bin/dobi");
        assert_eq!(plan.arguments, vec!["myapp:push".to_string()]);
        assert_eq!(builder.config().target(), "myapp");
    }
}
