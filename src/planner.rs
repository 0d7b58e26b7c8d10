use std::fmt;

use crate::{
    error::Result,
    models::{BuildConfig, EnvSnapshot, InvocationPlan},
};

pub const DOBI_PROGRAM: &str = "dobi";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Subcommand {
    Build,
    Push,
}

impl Subcommand {
    pub fn for_push(push: bool) -> Subcommand {
        if push {
            Subcommand::Push
        } else {
            Subcommand::Build
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Subcommand::Build => "build",
            Subcommand::Push => "push",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a build configuration to a dobi invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPlanner {
    program: String,
}

impl CommandPlanner {
    pub fn new<P: Into<String>>(program: P) -> CommandPlanner {
        CommandPlanner {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The target is joined to the subcommand as is; a target containing a
    /// colon is the caller's problem.
    pub fn plan(&self, config: &BuildConfig, inherited: &EnvSnapshot) -> Result<InvocationPlan> {
        let subcommand = Subcommand::for_push(config.push());
        let resource = format!("{}:{}", config.target(), subcommand);

        let mut environment = inherited.iter().cloned().collect::<Vec<_>>();
        environment.extend(
            config
                .environment()
                .iter()
                .map(|(key, value)| (key.into(), value.into())),
        );

        Ok(InvocationPlan {
            program: self.program.clone(),
            arguments: vec![resource],
            environment,
        })
    }
}

impl Default for CommandPlanner {
    fn default() -> Self {
        CommandPlanner::new(DOBI_PROGRAM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeMap as Map, ffi::OsStr};

    fn config(target: &str, push: bool, environment: &[(&str, &str)]) -> BuildConfig {
        let environment = environment
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<Map<_, _>>();
        BuildConfig::new(target, environment, push).unwrap()
    }

    #[test]
    fn build_mode_plans_build_subcommand() {
        let plan = CommandPlanner::default()
            .plan(&config("myapp", false, &[]), &EnvSnapshot::default())
            .unwrap();

        assert_eq!(plan.program, "dobi");
        assert_eq!(plan.arguments, vec!["myapp:build".to_string()]);
        assert!(plan.environment.is_empty());
    }

    #[test]
    fn push_mode_plans_push_subcommand() {
        let plan = CommandPlanner::default()
            .plan(&config("myapp", true, &[]), &EnvSnapshot::default())
            .unwrap();

        assert_eq!(plan.arguments, vec!["myapp:push".to_string()]);
        assert_eq!(plan.command_line(), "dobi myapp:push");
    }

    #[test]
    fn target_is_not_sanitized() {
        let plan = CommandPlanner::default()
            .plan(&config("my app:v1", false, &[]), &EnvSnapshot::default())
            .unwrap();

        assert_eq!(plan.arguments, vec!["my app:v1:build".to_string()]);
    }

    #[test]
    fn overrides_follow_inherited_entries() {
        let inherited = EnvSnapshot::from_pairs(vec![("FOO", "baz"), ("HOME", "/root")]);
        let plan = CommandPlanner::default()
            .plan(&config("myapp", false, &[("FOO", "bar"), ("EXTRA", "1")]), &inherited)
            .unwrap();

        assert_eq!(plan.environment.len(), 4);
        assert_eq!(&plan.environment[..2], &inherited.iter().cloned().collect::<Vec<_>>()[..]);
        assert_eq!(plan.resolve_env("FOO"), Some(OsStr::new("bar")));
        assert_eq!(plan.resolve_env("EXTRA"), Some(OsStr::new("1")));
        assert_eq!(plan.resolve_env("HOME"), Some(OsStr::new("/root")));
    }

    #[test]
    fn program_can_be_replaced() {
        let planner = CommandPlanner::new("/opt/dobi/bin/dobi");
        let plan = planner
            .plan(&config("web", false, &[]), &EnvSnapshot::default())
            .unwrap();

        assert_eq!(planner.program(), "/opt/dobi/bin/dobi");
        assert_eq!(plan.command_line(), "/opt/dobi/bin/dobi web:build");
    }
}
