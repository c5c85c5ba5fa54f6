//! Listener that feeds channel events into an aggregator and a bridge.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::aggregator::OutputAggregator;
use super::bridge::CompletionBridge;
use super::result::Completion;
use crate::channel::{ChannelFailure, ChannelState, ExecListener};

/// Wires one channel's callbacks to its output aggregator and completion
/// bridge.
///
/// Either terminal event seals the aggregator before resolving the
/// bridge, so no byte delivered after it can reach the result. On close
/// the sealed contents become the completion text; on failure the caller
/// reads them as partial output.
pub struct BridgeListener {
    aggregator: Arc<OutputAggregator>,
    bridge: Arc<CompletionBridge>,
    state: Mutex<ChannelState>,
}

impl BridgeListener {
    pub fn new(aggregator: Arc<OutputAggregator>, bridge: Arc<CompletionBridge>) -> Self {
        Self {
            aggregator,
            bridge,
            state: Mutex::new(ChannelState::Created),
        }
    }

    /// Current lifecycle state as seen by this listener.
    pub fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, to: ChannelState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = state.transition_to(to) {
            debug!("{}", e);
        }
    }
}

impl ExecListener for BridgeListener {
    fn on_open(&self, message: &str) {
        info!("Reading data... {}", message);
        self.advance(ChannelState::Open);
    }

    fn on_stdout(&self, data: &[u8]) {
        self.aggregator.append_stdout(data);
    }

    fn on_stderr(&self, data: &[u8]) {
        self.aggregator.append_stderr(data);
    }

    fn on_close(&self, code: i32, reason: &str) {
        info!("Exit with: {} and with reason: {}", code, reason);
        self.advance(ChannelState::Closed);

        // A failure that won already sealed the buffer as partial output.
        let text = if self.bridge.is_resolved() {
            String::new()
        } else {
            self.aggregator.seal_and_snapshot()
        };

        let completion = Completion {
            text,
            exit_code: code,
            reason: reason.to_string(),
        };
        if let Err(e) = self.bridge.resolve_success(completion) {
            warn!("{}", e);
        }
    }

    fn on_failure(&self, cause: ChannelFailure) {
        warn!("exec channel failed: {}", cause);
        self.advance(ChannelState::Failed);
        self.aggregator.seal();

        if let Err(e) = self.bridge.resolve_failure(cause) {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionResult;
    use std::time::Duration;

    fn listener() -> (BridgeListener, Arc<OutputAggregator>, Arc<CompletionBridge>) {
        let aggregator = Arc::new(OutputAggregator::new());
        let bridge = Arc::new(CompletionBridge::new());
        bridge.arm();
        (
            BridgeListener::new(aggregator.clone(), bridge.clone()),
            aggregator,
            bridge,
        )
    }

    #[test]
    fn test_close_captures_both_streams() {
        let (listener, _agg, bridge) = listener();
        listener.on_open("101 Switching Protocols");
        listener.on_stdout(b"hi\n");
        listener.on_stderr(b"warn\n");
        listener.on_close(0, "exited with status 0");

        assert_eq!(listener.state(), ChannelState::Closed);
        match bridge.wait(Duration::ZERO).unwrap() {
            ExecutionResult::Success(c) => {
                assert_eq!(c.text, "hi\nwarn\n");
                assert_eq!(c.exit_code, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_output_after_close_is_dropped() {
        let (listener, agg, _bridge) = listener();
        listener.on_stdout(b"kept");
        listener.on_close(0, "done");
        listener.on_stdout(b"late");

        assert_eq!(agg.snapshot(), "kept");
        assert_eq!(agg.dropped_bytes(), 4);
    }

    #[test]
    fn test_failure_then_close_keeps_failure_and_output() {
        let (listener, agg, bridge) = listener();
        listener.on_stdout(b"partial");
        listener.on_failure(ChannelFailure::new("connection reset"));
        listener.on_close(0, "late close");

        assert_eq!(listener.state(), ChannelState::Failed);
        assert_eq!(bridge.duplicate_signals(), 1);
        assert_eq!(
            bridge.wait(Duration::ZERO).unwrap(),
            ExecutionResult::Failure(ChannelFailure::new("connection reset"))
        );
        assert!(agg.is_sealed());
        assert_eq!(agg.snapshot(), "partial");
    }

    #[test]
    fn test_output_after_failure_is_dropped() {
        let (listener, agg, _bridge) = listener();
        listener.on_stdout(b"before");
        listener.on_failure(ChannelFailure::new("stream reset"));
        assert!(agg.is_sealed());

        listener.on_stdout(b"AFTER");
        listener.on_stderr(b"late");
        assert_eq!(agg.snapshot(), "before");
        assert_eq!(agg.dropped_bytes(), 9);
    }

    #[test]
    fn test_close_then_failure_keeps_success() {
        let (listener, _agg, bridge) = listener();
        listener.on_close(3, "exited with status 3");
        listener.on_failure(ChannelFailure::new("socket closed"));

        assert!(bridge.wait(Duration::ZERO).unwrap().is_success());
        assert_eq!(bridge.duplicate_signals(), 1);
    }
}
