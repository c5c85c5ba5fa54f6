//! Blocking command execution over exec channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use super::aggregator::OutputAggregator;
use super::bridge::{CompletionBridge, WaitError};
use super::command::Command;
use super::id::ExecId;
use super::listener::BridgeListener;
use super::result::{ExecOutput, ExecutionResult};
use super::target::TargetRegistry;
use crate::channel::{ChannelGuard, Transport};
use crate::error::ExecError;
use crate::Result;

/// Default execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a nonzero remote exit code is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Return `Ok` with the exit code in [`ExecOutput::exit_code`].
    #[default]
    Capture,
    /// Return [`ExecError::NonZeroExit`] carrying the captured output.
    FailOnNonZero,
}

/// Runs commands on registered targets through a transport.
///
/// Each call opens one channel, waits for its terminal event with a
/// deadline, and releases the channel on every exit path. A timeout only
/// releases this side; the remote command is not terminated and may keep
/// running.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    registry: Arc<TargetRegistry>,
    exit_policy: ExitPolicy,
}

impl Executor {
    /// Create a new executor.
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<TargetRegistry>) -> Self {
        Self {
            transport,
            registry,
            exit_policy: ExitPolicy::default(),
        }
    }

    /// Set the nonzero exit policy.
    pub fn with_exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    /// The configured nonzero exit policy.
    pub fn exit_policy(&self) -> ExitPolicy {
        self.exit_policy
    }

    /// The target registry.
    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Execute `command` on `target` and block until it finishes or
    /// `timeout` elapses.
    pub fn execute(&self, target: &str, command: &Command, timeout: Duration) -> Result<ExecOutput> {
        let id = ExecId::new();
        let span = info_span!("exec", id = %id, target = %target);
        let _enter = span.enter();

        if command.is_empty() {
            return Err(ExecError::InvalidCommand("empty command".into()));
        }

        let resolved = self.registry.resolve(target)?;
        info!(
            "Running command: {} on pod [{}] in namespace [{}]",
            command, resolved.target.name, resolved.target.namespace
        );

        let aggregator = Arc::new(OutputAggregator::new());
        let bridge = Arc::new(CompletionBridge::new());
        bridge.arm();
        let listener = Arc::new(BridgeListener::new(aggregator.clone(), bridge.clone()));

        let start = Instant::now();
        let mut channel = self
            .transport
            .open(&resolved, command, listener)
            .map(ChannelGuard::new)
            .map_err(|cause| {
                warn!("channel open failed: {}", cause);
                ExecError::ChannelOpenFailed(cause)
            })?;

        let outcome = bridge.wait(timeout);
        let duration = start.elapsed();
        // Fix the partial output at the deadline, before teardown.
        aggregator.seal();
        channel.release();

        match outcome {
            Ok(ExecutionResult::Success(completion)) => {
                let output = ExecOutput::from_completion(completion, duration);
                debug!(
                    "captured {} bytes in {:?} (exit {})",
                    output.output.len(),
                    duration,
                    output.exit_code
                );
                self.apply_exit_policy(output)
            }
            Ok(ExecutionResult::Failure(cause)) => Err(ExecError::RemoteFailure {
                cause,
                partial_output: aggregator.snapshot(),
            }),
            Err(WaitError::Timeout(after)) => {
                warn!("no terminal event after {:?}; remote command may still be running", after);
                Err(ExecError::Timeout {
                    after,
                    partial_output: aggregator.snapshot(),
                })
            }
            // Armed above, before the channel could deliver anything.
            Err(WaitError::NotArmed) => Err(ExecError::TaskFailed(
                WaitError::NotArmed.to_string(),
            )),
        }
    }

    /// Execute on tokio's blocking pool, for callers already on a runtime.
    pub async fn execute_async(
        &self,
        target: impl Into<String>,
        command: Command,
        timeout: Duration,
    ) -> Result<ExecOutput> {
        let executor = self.clone();
        let target = target.into();

        tokio::task::spawn_blocking(move || executor.execute(&target, &command, timeout))
            .await
            .map_err(|e| ExecError::TaskFailed(e.to_string()))?
    }

    fn apply_exit_policy(&self, output: ExecOutput) -> Result<ExecOutput> {
        match self.exit_policy {
            ExitPolicy::FailOnNonZero if !output.success() => Err(ExecError::NonZeroExit {
                code: output.exit_code,
                reason: output.reason,
                output: output.output,
            }),
            _ => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionTarget, TargetSpec};
    use crate::transport::{ScriptStep, ScriptedTransport};

    fn executor(transport: ScriptedTransport) -> Executor {
        let registry = TargetRegistry::new();
        registry.register(ExecutionTarget::new("default", "web"), TargetSpec::default());
        Executor::new(Arc::new(transport), Arc::new(registry))
    }

    #[test]
    fn test_empty_command_rejected_before_open() {
        let transport = ScriptedTransport::new(vec![ScriptStep::close(0)]);
        let opened = transport.open_count();
        let exec = executor(transport);

        let err = exec
            .execute("web", &Command::default(), DEFAULT_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand(_)));
        assert_eq!(opened.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_target_fails_fast() {
        let exec = executor(ScriptedTransport::new(vec![ScriptStep::Hang]));
        let start = Instant::now();

        let err = exec
            .execute("default/ghost", &Command::parse("ls"), Duration::from_secs(30))
            .unwrap_err();
        assert!(matches!(err, ExecError::TargetNotFound(_)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_nonzero_exit_captured_by_default() {
        let exec = executor(ScriptedTransport::new(vec![
            ScriptStep::stderr("boom\n"),
            ScriptStep::close(2),
        ]));

        let out = exec
            .execute("web", &Command::parse("false"), DEFAULT_TIMEOUT)
            .unwrap();
        assert_eq!(out.exit_code, 2);
        assert_eq!(out.output, "boom\n");
        assert!(!out.success());
    }

    #[test]
    fn test_nonzero_exit_fails_under_policy() {
        let exec = executor(ScriptedTransport::new(vec![
            ScriptStep::stdout("partial\n"),
            ScriptStep::close(1),
        ]))
        .with_exit_policy(ExitPolicy::FailOnNonZero);

        let err = exec
            .execute("web", &Command::parse("false"), DEFAULT_TIMEOUT)
            .unwrap_err();
        match err {
            ExecError::NonZeroExit { code, output, .. } => {
                assert_eq!(code, 1);
                assert_eq!(output, "partial\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_zero_exit_passes_under_policy() {
        let exec = executor(ScriptedTransport::new(vec![ScriptStep::close(0)]))
            .with_exit_policy(ExitPolicy::FailOnNonZero);
        assert!(exec
            .execute("web", &Command::parse("true"), DEFAULT_TIMEOUT)
            .is_ok());
    }

    #[test]
    fn test_execute_async() {
        let exec = executor(ScriptedTransport::new(vec![
            ScriptStep::stdout("async\n"),
            ScriptStep::close(0),
        ]));

        let out = tokio_test::block_on(exec.execute_async(
            "default/web",
            Command::parse("echo async"),
            DEFAULT_TIMEOUT,
        ))
        .unwrap();
        assert_eq!(out.output, "async\n");
    }

    #[test]
    fn test_exit_policy_serde() {
        let policy: ExitPolicy = serde_json::from_str("\"fail_on_non_zero\"").unwrap();
        assert_eq!(policy, ExitPolicy::FailOnNonZero);
        assert_eq!(serde_json::to_string(&ExitPolicy::Capture).unwrap(), "\"capture\"");
    }
}
