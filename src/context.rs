use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::models::EnvSnapshot;

pub use crate::error::CancelReason;

/// A flag the host can flip from any thread to stop a running build.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a single build call gets from its host besides the UI.
#[derive(Clone, Debug)]
pub struct BuildContext {
    cancel: CancelToken,
    deadline: Option<Instant>,
    environment: EnvSnapshot,
}

impl BuildContext {
    /// A context inheriting the current process environment.
    pub fn new() -> BuildContext {
        BuildContext {
            cancel: CancelToken::new(),
            deadline: None,
            environment: EnvSnapshot::from_process(),
        }
    }

    pub fn with_environment(mut self, environment: EnvSnapshot) -> BuildContext {
        self.environment = environment;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> BuildContext {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> BuildContext {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> BuildContext {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn environment(&self) -> &EnvSnapshot {
        &self.environment
    }

    /// Why the build should stop now, if it should.
    pub fn interruption(&self) -> Option<CancelReason> {
        if self.cancel.is_cancelled() {
            return Some(CancelReason::Requested);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        BuildContext::new()
    }
}
