//! Error types for exec-bridge.

use std::time::Duration;

use thiserror::Error;

use crate::channel::ChannelFailure;

/// Main error type for command execution.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The command has no program token.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// No execution target is registered under the given name.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The transport could not open a channel.
    #[error("failed to open exec channel: {0}")]
    ChannelOpenFailed(ChannelFailure),

    /// The channel reported a failure as its terminal event.
    #[error("remote execution failed: {cause}")]
    RemoteFailure {
        cause: ChannelFailure,
        /// Output received before the failure.
        partial_output: String,
    },

    /// No terminal event arrived before the deadline.
    #[error("command execution timeout after {after:?}")]
    Timeout {
        after: Duration,
        /// Output received before the deadline.
        partial_output: String,
    },

    /// The remote command exited with a nonzero code under
    /// [`ExitPolicy::FailOnNonZero`](crate::execution::ExitPolicy::FailOnNonZero).
    #[error("remote command exited with code {code}: {reason}")]
    NonZeroExit {
        code: i32,
        reason: String,
        output: String,
    },

    /// The blocking execution task could not be joined.
    #[error("execution task failed: {0}")]
    TaskFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Output captured before the error, if the error carries any.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::RemoteFailure { partial_output, .. } | Self::Timeout { partial_output, .. } => {
                Some(partial_output)
            }
            Self::NonZeroExit { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Whether the error is a deadline expiry rather than a remote-side failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A second terminal event arrived after the channel was already resolved.
///
/// Reported by the completion bridge and logged; never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate terminal signal ignored: {rejected} after {kept}")]
pub struct DuplicateTerminalSignal {
    /// Kind of the result that was kept.
    pub kept: &'static str,
    /// Kind of the result that was rejected.
    pub rejected: &'static str,
}

/// Convenience Result type for exec-bridge operations.
pub type Result<T> = std::result::Result<T, ExecError>;
