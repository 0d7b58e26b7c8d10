//! Build step adapter for the dobi build tool.
//!
//! A host hands over a decoded configuration value, the adapter turns it into
//! a `dobi <image>:<build|push>` invocation, streams the tool's output into a
//! progress step and reports success or failure back.

pub mod backends;
pub mod builder;
pub mod context;
pub mod controller;
pub mod error;
pub mod frontends;
pub mod models;
pub mod planner;
pub mod progress;
pub mod services;

pub use builder::DobiBuilder;
pub use context::{BuildContext, CancelReason, CancelToken};
pub use controller::Controller;
pub use error::{Error, Result};
pub use models::{BuildConfig, BuildResult, EnvSnapshot, InvocationPlan};
pub use progress::{MemoryReporter, ProgressStep, StepStatus, TerminalReporter};
pub use services::{Buildable, ProgressReporter};
