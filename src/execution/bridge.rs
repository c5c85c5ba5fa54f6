//! Completion bridge: turns a channel's terminal event into a blocking,
//! deadline-bounded wait.
//!
//! The bridge is a write-once slot guarded by a mutex and a condition
//! variable. The transport's delivery context resolves it; the invoking
//! context waits on it. The first resolution wins. Any later resolution is
//! rejected with [`DuplicateTerminalSignal`] and leaves the slot untouched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{trace, warn};

use super::result::{Completion, ExecutionResult};
use crate::channel::ChannelFailure;
use crate::error::DuplicateTerminalSignal;

/// Why [`CompletionBridge::wait`] returned without a result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline passed with no terminal event.
    #[error("no terminal event within {0:?}")]
    Timeout(Duration),
    /// `wait` was called before `arm`.
    #[error("completion bridge was never armed")]
    NotArmed,
}

#[derive(Debug)]
enum Slot {
    Unarmed,
    Pending,
    Resolved(ExecutionResult),
}

/// Single-assignment result slot with a blocking, timed wait.
#[derive(Debug)]
pub struct CompletionBridge {
    slot: Mutex<Slot>,
    resolved: Condvar,
    duplicates: AtomicUsize,
}

impl CompletionBridge {
    /// Create an unarmed bridge.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Unarmed),
            resolved: Condvar::new(),
            duplicates: AtomicUsize::new(0),
        }
    }

    /// Prepare the unresolved slot. Call once, before the channel opens.
    ///
    /// Returns `false` if the bridge was already armed or resolved.
    pub fn arm(&self) -> bool {
        let mut slot = self.lock();
        match *slot {
            Slot::Unarmed => {
                *slot = Slot::Pending;
                true
            }
            _ => {
                warn!("completion bridge armed twice");
                false
            }
        }
    }

    /// Resolve with a normal close.
    pub fn resolve_success(&self, completion: Completion) -> Result<(), DuplicateTerminalSignal> {
        self.resolve(ExecutionResult::Success(completion))
    }

    /// Resolve with a channel failure.
    pub fn resolve_failure(&self, cause: ChannelFailure) -> Result<(), DuplicateTerminalSignal> {
        self.resolve(ExecutionResult::Failure(cause))
    }

    /// Store `result` if the slot is still open and wake the waiter.
    ///
    /// A resolution arriving before `arm` is accepted: the channel owns
    /// event timing, and dropping a real terminal event would leave the
    /// caller waiting for the full deadline.
    pub fn resolve(&self, result: ExecutionResult) -> Result<(), DuplicateTerminalSignal> {
        let mut slot = self.lock();
        if let Slot::Resolved(kept) = &*slot {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            return Err(DuplicateTerminalSignal {
                kept: kept.kind(),
                rejected: result.kind(),
            });
        }

        trace!("completion bridge resolved: {}", result.kind());
        *slot = Slot::Resolved(result);
        drop(slot);
        self.resolved.notify_all();
        Ok(())
    }

    /// Block until resolved or until `timeout` has elapsed.
    ///
    /// Returns a copy of the result, so waiting again after a resolution
    /// yields the same value. `Timeout` is only returned once the full
    /// `timeout` has passed.
    pub fn wait(&self, timeout: Duration) -> Result<ExecutionResult, WaitError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.lock();

        loop {
            match &*slot {
                Slot::Resolved(result) => return Ok(result.clone()),
                Slot::Unarmed => return Err(WaitError::NotArmed),
                Slot::Pending => {}
            }

            slot = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(WaitError::Timeout(timeout));
                    }
                    self.resolved
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                // Deadline overflowed `Instant`; wait without one.
                None => self
                    .resolved
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Check if a terminal result has been stored.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock(), Slot::Resolved(_))
    }

    /// Number of terminal signals rejected after the first.
    pub fn duplicate_signals(&self) -> usize {
        self.duplicates.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CompletionBridge {
    fn default() -> Self {
        Self::new()
    }
}
