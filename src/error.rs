use std::{fmt, io, process::ExitStatus};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The configuration handed over by the host was rejected. No build was
    /// attempted.
    #[error("invalid build configuration (`{field}`): {reason}")]
    Validation { field: String, reason: String },

    /// The external tool could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external tool ran and exited unsuccessfully.
    #[error("`{command}` failed: {status}")]
    Execution { command: String, status: ExitStatus },

    #[error("`{command}` was cancelled: {reason}")]
    Cancelled {
        command: String,
        reason: CancelReason,
    },

    #[error("lost track of `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The external tool's output could not be read.
    #[error("failed to read output of `{command}`: {source}")]
    Read {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The external tool's output could not be written to the sink.
    #[error("failed to forward output of `{command}`: {source}")]
    Output {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Exit code of the external tool, if it exited on its own with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::Execution { status, .. } => status.code(),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CancelReason {
    Requested,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => f.write_str("cancellation requested"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_field() {
        let err = Error::validation("target", "must be set to a valid image reference");
        let message = err.to_string();

        assert!(message.contains("`target`"), "{}", message);
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn cancel_reasons_read_naturally() {
        assert_eq!(
            CancelReason::DeadlineExceeded.to_string(),
            "deadline exceeded"
        );
        assert_eq!(
            CancelReason::Requested.to_string(),
            "cancellation requested"
        );
    }
}
