use std::{
    collections::BTreeMap as Map,
    env,
    ffi::{OsStr, OsString},
    process::Command,
};

use crate::error::{Error, Result};

/// A validated build configuration. The target is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    target: String,
    environment: Map<String, String>,
    push: bool,
}

impl BuildConfig {
    pub fn new<T>(target: T, environment: Map<String, String>, push: bool) -> Result<BuildConfig>
    where
        T: Into<String>,
    {
        let target = target.into();
        if target.is_empty() {
            return Err(Error::validation(
                "target",
                "must be set to a valid image reference",
            ));
        }

        Ok(BuildConfig {
            target,
            environment,
            push,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn environment(&self) -> &Map<String, String> {
        &self.environment
    }

    pub fn push(&self) -> bool {
        self.push
    }
}

/// A read-only copy of an environment, in the order it was captured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSnapshot(Vec<(OsString, OsString)>);

impl EnvSnapshot {
    pub fn from_process() -> EnvSnapshot {
        EnvSnapshot(env::vars_os().collect())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> EnvSnapshot
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        EnvSnapshot(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &(OsString, OsString)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A concrete invocation of the external tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationPlan {
    pub program: String,
    pub arguments: Vec<String>,
    /// Inherited entries first, overrides after. Duplicate keys are kept;
    /// the last entry for a key wins.
    pub environment: Vec<(OsString, OsString)>,
}

impl InvocationPlan {
    /// The command as a user would type it.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for argument in self.arguments.iter() {
            line.push(' ');
            line.push_str(argument);
        }
        line
    }

    /// Looks up `key` the way the launched process will see it.
    pub fn resolve_env<K: AsRef<OsStr>>(&self, key: K) -> Option<&OsStr> {
        let key = key.as_ref();
        self.environment
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }

    /// Builds the process description. Arguments are passed as a vector,
    /// never through a shell.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.arguments)
            .env_clear()
            .envs(self.environment.iter().map(|(key, value)| (key, value)));
        command
    }
}

/// Marker returned to the host after a successful build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildResult;
