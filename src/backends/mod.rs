pub mod process;

pub use process::ProcessRunner;
