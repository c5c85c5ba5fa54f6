//! Transports that open exec channels.
//!
//! - [`LocalTransport`] runs commands as local child processes, optionally
//!   behind a launcher such as `docker exec` or `kubectl exec`.
//! - [`ScriptedTransport`] replays a fixed sequence of channel events.

mod local;
mod scripted;

pub use local::LocalTransport;
pub use scripted::{ScriptStep, ScriptedTransport};
