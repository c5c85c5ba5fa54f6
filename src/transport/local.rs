//! Local process transport.
//!
//! Runs each command as a child process, prefixed by the target's launcher
//! (e.g. `docker exec -i web` or `kubectl exec -i -n default web-0 --`).
//! Output is pumped by tasks on a runtime owned by the transport, which is
//! the channel's delivery context.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::runtime::Runtime;
use tracing::{debug, error, trace};

use crate::channel::{Channel, ChannelFailure, ExecListener, Transport};
use crate::execution::{Command, ResolvedTarget};

/// Default buffer size for reading process output.
const READ_BUFFER_SIZE: usize = 4096;

/// Delivery worker threads.
const DELIVERY_THREADS: usize = 2;

/// Transport that spawns local child processes.
pub struct LocalTransport {
    runtime: Option<Runtime>,
}

impl LocalTransport {
    /// Create a transport with its own delivery runtime.
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(DELIVERY_THREADS)
            .thread_name("exec-delivery")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn build_command(target: &ResolvedTarget, command: &Command) -> Option<tokio::process::Command> {
        let mut argv = target.spec.launcher.iter().chain(command.argv());
        let program = argv.next()?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(argv)
            .envs(&target.spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Releasing a channel never terminates the remote command.
            .kill_on_drop(false);

        if let Some(dir) = &target.spec.working_dir {
            cmd.current_dir(dir);
        }

        Some(cmd)
    }
}

impl Transport for LocalTransport {
    fn open(
        &self,
        target: &ResolvedTarget,
        command: &Command,
        listener: Arc<dyn ExecListener>,
    ) -> Result<Box<dyn Channel>, ChannelFailure> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| ChannelFailure::new("transport is shut down"))?;

        let mut cmd = Self::build_command(target, command)
            .ok_or_else(|| ChannelFailure::new("empty command"))?;

        // Spawning registers the child with the runtime's reactor.
        let child = {
            let _guard = runtime.enter();
            cmd.spawn().map_err(|e| {
                ChannelFailure::new(format!("failed to start {} on {}: {}", command, target.target, e))
            })?
        };

        debug!("spawned {:?} for {}", child.id(), target.target);
        let released = Arc::new(AtomicBool::new(false));
        runtime.spawn(pump(child, listener, Arc::clone(&released)));

        Ok(Box::new(LocalChannel { released }))
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        // Safe to call from inside another runtime, unlike a plain drop.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Releasing detaches the listener only. The pump keeps draining the
/// child's pipes until it exits, so a released command is not killed by
/// a broken pipe. Dropping the transport stops all pumps.
struct LocalChannel {
    released: Arc<AtomicBool>,
}

impl Channel for LocalChannel {
    fn release(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            trace!("listener detached; draining output");
        }
    }
}

/// Forward both output streams, then report how the process ended.
///
/// The terminal event fires only after both streams hit EOF, so every
/// byte the process wrote is delivered first. Nothing reaches the listener
/// once `released` is set.
async fn pump(mut child: Child, listener: Arc<dyn ExecListener>, released: Arc<AtomicBool>) {
    let attached = || !released.load(Ordering::SeqCst);
    let pid = child
        .id()
        .map_or_else(|| "unknown".to_string(), |id| id.to_string());
    listener.on_open(&format!("process {} started", pid));

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (out, err) = tokio::join!(
        forward(stdout, |data| {
            if attached() {
                listener.on_stdout(data);
            }
        }),
        forward(stderr, |data| {
            if attached() {
                listener.on_stderr(data);
            }
        }),
    );

    if let Err(e) = out.and(err) {
        error!("output stream error: {}", e);
        if attached() {
            listener.on_failure(ChannelFailure::new(format!("output stream error: {}", e)));
        }
        return;
    }

    let status = child.wait().await;
    if !attached() {
        debug!("released command ended: {:?}", status);
        return;
    }

    match status {
        Ok(status) => {
            let (code, reason) = describe_exit(status);
            listener.on_close(code, &reason);
        }
        Err(e) => listener.on_failure(ChannelFailure::from(e)),
    }
}

async fn forward<R, F>(reader: Option<R>, mut sink: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => {
                trace!("read {} bytes", n);
                sink(&buf[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Exit code and close reason for a finished process.
///
/// Signal deaths map to `128 + signal`, the shell convention.
fn describe_exit(status: ExitStatus) -> (i32, String) {
    if let Some(code) = status.code() {
        return (code, format!("exited with status {}", code));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (128 + signal, format!("terminated by signal {}", signal));
        }
    }

    (-1, "terminated without exit code".to_string())
}
