//! Execution result types.

use std::time::Duration;

use crate::channel::ChannelFailure;

/// Source of output data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// What a channel reported when it closed normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Captured stdout and stderr, in arrival order.
    pub text: String,
    /// Exit code reported with the close event.
    pub exit_code: i32,
    /// Close reason reported with the close event.
    pub reason: String,
}

/// Terminal outcome of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The channel closed; the remote command ran to completion.
    Success(Completion),
    /// The channel failed before the command completed.
    Failure(ChannelFailure),
}

impl ExecutionResult {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }

    /// Check if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Output of a completed execution, returned to callers.
///
/// A nonzero `exit_code` is still a completed execution; whether it is
/// reported as `Ok` is decided by [`ExitPolicy`](super::ExitPolicy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured stdout and stderr, in arrival order.
    pub output: String,
    /// Exit code of the remote command.
    pub exit_code: i32,
    /// Close reason reported by the channel.
    pub reason: String,
    /// Time from channel open to terminal event.
    pub duration: Duration,
}

impl ExecOutput {
    /// Build from a completion and the measured duration.
    pub fn from_completion(completion: Completion, duration: Duration) -> Self {
        Self {
            output: completion.text,
            exit_code: completion.exit_code,
            reason: completion.reason,
            duration,
        }
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(text: &str, code: i32) -> Completion {
        Completion {
            text: text.to_string(),
            exit_code: code,
            reason: String::new(),
        }
    }

    #[test]
    fn test_result_kind() {
        assert_eq!(ExecutionResult::Success(completion("", 0)).kind(), "success");
        let failed = ExecutionResult::Failure(ChannelFailure::new("reset"));
        assert_eq!(failed.kind(), "failure");
        assert!(!failed.is_success());
    }

    #[test]
    fn test_output_success() {
        let out = ExecOutput::from_completion(completion("hi\n", 0), Duration::from_millis(5));
        assert!(out.success());
        assert_eq!(out.output, "hi\n");
        assert_eq!(out.duration, Duration::from_millis(5));
    }

    #[test]
    fn test_output_nonzero() {
        let out = ExecOutput::from_completion(completion("", 2), Duration::ZERO);
        assert!(!out.success());
        assert_eq!(out.exit_code, 2);
    }
}
