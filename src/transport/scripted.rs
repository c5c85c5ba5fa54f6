//! Scripted transport that replays a fixed event sequence.
//!
//! Each opened channel gets its own delivery thread, which plays the script
//! step by step. Useful for driving the executor through hangs, failures,
//! and misbehaving transports without a real remote.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::channel::{Channel, ChannelFailure, ExecListener, Transport};
use crate::execution::{Command, ResolvedTarget};

/// Poll interval while a hanging script waits for release.
const HANG_POLL: Duration = Duration::from_millis(10);

/// One scripted channel event.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// `on_open` with the given message.
    Open(String),
    /// `on_stdout` with the given bytes.
    Stdout(Vec<u8>),
    /// `on_stderr` with the given bytes.
    Stderr(Vec<u8>),
    /// `on_close` with code and reason.
    Close { code: i32, reason: String },
    /// `on_failure` with the given cause.
    Fail(ChannelFailure),
    /// Pause the delivery thread.
    Sleep(Duration),
    /// Deliver nothing more until the channel is released.
    Hang,
}

impl ScriptStep {
    pub fn stdout(data: impl AsRef<[u8]>) -> Self {
        Self::Stdout(data.as_ref().to_vec())
    }

    pub fn stderr(data: impl AsRef<[u8]>) -> Self {
        Self::Stderr(data.as_ref().to_vec())
    }

    /// Close with `code` and a reason derived from it.
    pub fn close(code: i32) -> Self {
        Self::Close {
            code,
            reason: format!("exited with status {code}"),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(ChannelFailure::new(message))
    }
}

/// Transport whose channels replay a script.
pub struct ScriptedTransport {
    steps: Vec<ScriptStep>,
    open_error: Option<ChannelFailure>,
    deliver_after_release: bool,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Create a transport replaying `steps` on every channel.
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            open_error: None,
            deliver_after_release: false,
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every `open` fail immediately with `cause`.
    pub fn failing_open(cause: ChannelFailure) -> Self {
        Self {
            open_error: Some(cause),
            ..Self::new(Vec::new())
        }
    }

    /// Keep delivering events after release, like a transport that does
    /// not stop its reader on teardown.
    pub fn deliver_after_release(mut self) -> Self {
        self.deliver_after_release = true;
        self
    }

    /// Counter of successfully opened channels.
    pub fn open_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }

    /// Counter of released channels (each channel counts once).
    pub fn release_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl Transport for ScriptedTransport {
    fn open(
        &self,
        target: &ResolvedTarget,
        command: &Command,
        listener: Arc<dyn ExecListener>,
    ) -> Result<Box<dyn Channel>, ChannelFailure> {
        if let Some(cause) = &self.open_error {
            return Err(cause.clone());
        }

        debug!("scripted channel for {} on {}", command, target.target);
        let released = Arc::new(AtomicBool::new(false));
        let steps = self.steps.clone();
        let stop_on_release = !self.deliver_after_release;
        let flag = Arc::clone(&released);

        thread::Builder::new()
            .name("scripted-exec".into())
            .spawn(move || play(steps, listener.as_ref(), &flag, stop_on_release))
            .map_err(ChannelFailure::from)?;
        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedChannel {
            released,
            releases: Arc::clone(&self.releases),
        }))
    }
}

fn play(steps: Vec<ScriptStep>, listener: &dyn ExecListener, released: &AtomicBool, stop: bool) {
    for step in steps {
        if stop && released.load(Ordering::SeqCst) {
            trace!("scripted channel released; stopping delivery");
            return;
        }

        match step {
            ScriptStep::Open(message) => listener.on_open(&message),
            ScriptStep::Stdout(data) => listener.on_stdout(&data),
            ScriptStep::Stderr(data) => listener.on_stderr(&data),
            ScriptStep::Close { code, reason } => listener.on_close(code, &reason),
            ScriptStep::Fail(cause) => listener.on_failure(cause),
            ScriptStep::Sleep(pause) => thread::sleep(pause),
            ScriptStep::Hang => {
                while !released.load(Ordering::SeqCst) {
                    thread::sleep(HANG_POLL);
                }
            }
        }
    }
}

struct ScriptedChannel {
    released: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl Channel for ScriptedChannel {
    fn release(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
