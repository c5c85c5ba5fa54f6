//! # exec-bridge
//!
//! Blocking, timeout-bounded command execution over callback-driven
//! remote exec channels.
//!
//! A remote exec stream (a container exec session, a pod exec websocket,
//! an SSH channel) reports output and lifecycle events through callbacks on
//! a context the caller does not own. This crate turns one such stream into
//! one blocking call that either returns the captured output or fails with
//! a distinguishable error, and always releases the channel.
//!
//! ## Features
//!
//! - **Completion bridge**: first-terminal-event-wins result slot with a
//!   deadline-bounded wait
//! - **Output aggregation**: stdout and stderr in arrival order, sealed at
//!   the terminal event
//! - **Scoped channels**: released on success, failure, and timeout alike
//! - **Transports**: local processes (optionally behind `docker exec` /
//!   `kubectl exec` launchers) and a scripted transport for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use exec_bridge::{Command, Config, Executor, LocalTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     exec_bridge::logging::try_init().ok();
//!
//!     let config = Config::default();
//!     let executor = Executor::new(Arc::new(LocalTransport::new()?), Arc::new(config.registry()?));
//!
//!     let out = executor.execute("default/local", &Command::parse("echo hi"), Duration::from_secs(5))?;
//!     assert_eq!(out.output, "hi\n");
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! A timeout releases the caller and tears down this side of the channel.
//! It does not terminate the remote command, which may keep running.

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod transport;

// Re-export commonly used types
pub use channel::{Channel, ChannelFailure, ChannelGuard, ChannelState, ExecListener, Transport};
pub use config::{Config, ConfigError};
pub use error::{DuplicateTerminalSignal, ExecError, Result};
pub use execution::{
    Command, CompletionBridge, ExecOutput, ExecutionResult, ExecutionTarget, Executor, ExitPolicy,
    OutputAggregator, TargetRegistry, TargetSpec,
};
pub use transport::{LocalTransport, ScriptStep, ScriptedTransport};
