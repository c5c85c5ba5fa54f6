//! Channel lifecycle state machine.

use thiserror::Error;

/// Lifecycle state of a remote execution channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Channel has been requested but the stream is not open yet.
    #[default]
    Created,
    /// Stream is open and output may arrive.
    Open,
    /// Command finished; terminal.
    Closed,
    /// Stream broke; terminal.
    Failed,
}

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid channel transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: ChannelState,
    pub to: ChannelState,
}

impl ChannelState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Open
    /// - Created -> Closed
    /// - Created -> Failed
    /// - Open -> Closed
    /// - Open -> Failed
    ///
    /// Some transports never report an open event, so a terminal event
    /// straight from `Created` is accepted.
    pub fn can_transition_to(&self, target: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (*self, target),
            (Created, Open) | (Created, Closed) | (Created, Failed) | (Open, Closed) | (Open, Failed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// The state is left unchanged on error.
    pub fn transition_to(&mut self, target: ChannelState) -> Result<(), InvalidTransition> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::Closed | ChannelState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_close() {
        let mut state = ChannelState::Created;
        assert!(state.transition_to(ChannelState::Open).is_ok());
        assert!(state.transition_to(ChannelState::Closed).is_ok());
        assert_eq!(state, ChannelState::Closed);
    }

    #[test]
    fn test_fail_without_open() {
        let mut state = ChannelState::Created;
        assert!(state.transition_to(ChannelState::Failed).is_ok());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_second_terminal_rejected() {
        let mut state = ChannelState::Open;
        state.transition_to(ChannelState::Failed).unwrap();

        let err = state.transition_to(ChannelState::Closed).unwrap_err();
        assert_eq!(err.from, ChannelState::Failed);
        assert_eq!(err.to, ChannelState::Closed);
        assert_eq!(state, ChannelState::Failed);
    }

    #[test]
    fn test_reopen_rejected() {
        let mut state = ChannelState::Open;
        assert!(state.transition_to(ChannelState::Open).is_err());
        assert!(state.transition_to(ChannelState::Created).is_err());
    }

    #[test]
    fn test_is_terminal() {
        assert!(!ChannelState::Created.is_terminal());
        assert!(!ChannelState::Open.is_terminal());
        assert!(ChannelState::Closed.is_terminal());
        assert!(ChannelState::Failed.is_terminal());
    }

    #[test]
    fn test_default() {
        assert_eq!(ChannelState::default(), ChannelState::Created);
    }
}
