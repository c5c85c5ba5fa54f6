//! Output aggregation for interleaved stdout/stderr.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::result::OutputSource;

/// Collects bytes from both output streams into one buffer, in arrival order.
///
/// Written from the transport's delivery context, read by the caller once
/// the channel has terminated. After [`seal_and_snapshot`] further bytes
/// are dropped, so output delivered after teardown never shows up in a
/// result.
///
/// [`seal_and_snapshot`]: OutputAggregator::seal_and_snapshot
#[derive(Debug, Default)]
pub struct OutputAggregator {
    inner: Mutex<Buffer>,
}

#[derive(Debug, Default)]
struct Buffer {
    data: Vec<u8>,
    stdout_bytes: usize,
    stderr_bytes: usize,
    dropped_bytes: usize,
    sealed: bool,
}

impl OutputAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes written to standard output.
    pub fn append_stdout(&self, data: &[u8]) {
        self.append(OutputSource::Stdout, data);
    }

    /// Append bytes written to standard error.
    pub fn append_stderr(&self, data: &[u8]) {
        self.append(OutputSource::Stderr, data);
    }

    /// Append bytes from the given stream.
    pub fn append(&self, source: OutputSource, data: &[u8]) {
        let mut buf = self.lock();
        if buf.sealed {
            buf.dropped_bytes += data.len();
            trace!("dropping {} {:?} bytes after seal", data.len(), source);
            return;
        }

        buf.data.extend_from_slice(data);
        match source {
            OutputSource::Stdout => buf.stdout_bytes += data.len(),
            OutputSource::Stderr => buf.stderr_bytes += data.len(),
        }
    }

    /// Current contents as text.
    pub fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.lock().data).into_owned()
    }

    /// Stop accepting bytes. Idempotent.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    /// Stop accepting bytes and return the final contents.
    pub fn seal_and_snapshot(&self) -> String {
        let mut buf = self.lock();
        buf.sealed = true;
        String::from_utf8_lossy(&buf.data).into_owned()
    }

    /// Whether the aggregator has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    /// Bytes accepted from standard output.
    pub fn stdout_bytes(&self) -> usize {
        self.lock().stdout_bytes
    }

    /// Bytes accepted from standard error.
    pub fn stderr_bytes(&self) -> usize {
        self.lock().stderr_bytes
    }

    /// Bytes discarded because they arrived after sealing.
    pub fn dropped_bytes(&self) -> usize {
        self.lock().dropped_bytes
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // Appends are single extend calls, so a poisoned buffer is still whole.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
