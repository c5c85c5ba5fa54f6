//! Remote execution channel abstraction.
//!
//! A channel is one duplex stream bound to one command on one target. The
//! transport that opens it delivers output and lifecycle events to an
//! [`ExecListener`] from its own delivery context; the caller that opened it
//! owns the returned [`Channel`] and must release it.
//!
//! Delivery contract every transport upholds:
//! - `on_stdout` / `on_stderr` fire zero or more times,
//! - all output is delivered before the terminal event,
//! - exactly one of `on_close` / `on_failure` fires, exactly once.
//!
//! Listeners still have to tolerate transports that break the last rule.

mod state;

pub use state::{ChannelState, InvalidTransition};

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::execution::{Command, ResolvedTarget};

/// Cause of a channel failure, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    /// Human readable cause.
    pub message: String,
    /// Transport-level status attached to the failure (e.g. an HTTP
    /// status line from an upgrade response), if any.
    pub status: Option<String>,
}

impl ChannelFailure {
    /// Create a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Attach a transport status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ChannelFailure {}

impl From<std::io::Error> for ChannelFailure {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Receiver of channel events.
///
/// Called from the transport's delivery context, never from the thread that
/// opened the channel.
pub trait ExecListener: Send + Sync {
    /// The stream is open and the command is running.
    fn on_open(&self, message: &str) {
        debug!("channel open: {}", message);
    }

    /// Bytes written by the command to standard output.
    fn on_stdout(&self, data: &[u8]);

    /// Bytes written by the command to standard error.
    fn on_stderr(&self, data: &[u8]);

    /// Terminal: the command finished with `code`.
    fn on_close(&self, code: i32, reason: &str);

    /// Terminal: the stream broke before the command finished.
    fn on_failure(&self, cause: ChannelFailure);
}

/// An open channel, exclusively owned by the caller that opened it.
pub trait Channel: Send {
    /// Tear down this side of the stream.
    ///
    /// Must be idempotent. Does not terminate the remote command.
    fn release(&mut self);
}

/// Something that can open exec channels against resolved targets.
pub trait Transport: Send + Sync {
    /// Open a channel running `command` on `target`.
    ///
    /// An `Err` means no channel exists and no listener event will fire.
    fn open(
        &self,
        target: &ResolvedTarget,
        command: &Command,
        listener: Arc<dyn ExecListener>,
    ) -> Result<Box<dyn Channel>, ChannelFailure>;
}

/// Releases the wrapped channel when dropped.
pub struct ChannelGuard {
    channel: Box<dyn Channel>,
    released: bool,
}

impl ChannelGuard {
    /// Take ownership of an open channel.
    pub fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            released: false,
        }
    }

    /// Release the channel now. Later calls and the drop are no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.channel.release();
            debug!("channel released");
        }
    }

    /// Whether the channel has been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel(Arc<AtomicUsize>);

    impl Channel for CountingChannel {
        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let _guard = ChannelGuard::new(Box::new(CountingChannel(count.clone())));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut guard = ChannelGuard::new(Box::new(CountingChannel(count.clone())));
        guard.release();
        guard.release();
        assert!(guard.is_released());
        drop(guard);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_on_early_return() {
        fn bail(count: Arc<AtomicUsize>) -> Result<(), ChannelFailure> {
            let _guard = ChannelGuard::new(Box::new(CountingChannel(count)));
            Err(ChannelFailure::new("early"))
        }

        let count = Arc::new(AtomicUsize::new(0));
        assert!(bail(count.clone()).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_display() {
        let failure = ChannelFailure::new("upgrade rejected").with_status("403 Forbidden");
        assert_eq!(failure.to_string(), "upgrade rejected (403 Forbidden)");
        assert_eq!(ChannelFailure::new("reset").to_string(), "reset");
    }

    #[test]
    fn test_failure_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let failure: ChannelFailure = io_err.into();
        assert!(failure.message.contains("pipe closed"));
        assert!(failure.status.is_none());
    }
}
