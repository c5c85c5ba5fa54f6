//! Blocking command execution over exec channels.
//!
//! This module provides:
//! - Output aggregation across stdout and stderr
//! - A single-assignment completion bridge with a timed wait
//! - Target resolution and the blocking [`Executor`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use exec_bridge::execution::{Command, ExecutionTarget, Executor, TargetRegistry, TargetSpec};
//! use exec_bridge::transport::LocalTransport;
//!
//! let registry = TargetRegistry::new();
//! registry.register(
//!     ExecutionTarget::new("default", "web-0"),
//!     TargetSpec::with_launcher(["kubectl", "exec", "-i", "-n", "default", "web-0", "--"]),
//! );
//!
//! let executor = Executor::new(Arc::new(LocalTransport::new()?), Arc::new(registry));
//! let out = executor.execute("default/web-0", &Command::parse("df -h"), Duration::from_secs(10))?;
//! println!("{}", out.output);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod aggregator;
mod bridge;
mod command;
mod executor;
mod id;
mod listener;
mod result;
mod target;

pub use aggregator::OutputAggregator;
pub use bridge::{CompletionBridge, WaitError};
pub use command::Command;
pub use executor::{Executor, ExitPolicy, DEFAULT_TIMEOUT};
pub use id::ExecId;
pub use listener::BridgeListener;
pub use result::{Completion, ExecOutput, ExecutionResult, OutputSource};
pub use target::{ExecutionTarget, ResolvedTarget, TargetRegistry, TargetSpec, DEFAULT_NAMESPACE};
