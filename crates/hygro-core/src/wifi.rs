//! WiFi join supervision.
//!
//! The radio driver is opaque to this module: the startup loop observes
//! it once per poll interval and feeds the observation into
//! [`JoinSupervisor`], an explicit state machine. Tests drive the
//! machine with a fixed sequence of simulated statuses instead of a
//! live radio.
//!
//! The join sequence runs once, at startup. A terminal failure is final:
//! the device has nothing to publish to and nothing actionable to show,
//! so it fails closed rather than looping on a bad config. Steady-state
//! network blips are handled per-call by the publisher, never by
//! re-running the join.

use thiserror_no_std::Error;

/// Wireless link state, owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state; no join requested yet.
    Disconnected,
    /// Join requested, association and DHCP still in progress.
    Connecting,
    /// Associated with an address; publishing is eligible.
    Connected,
    /// Terminal join failure. The device halts.
    Failed,
}

/// Why the join sequence can never succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinFailure {
    /// The radio could not be started at all.
    #[error("radio failed to start")]
    RadioFailure,
    /// The access point rejected or never completed the association.
    #[error("association with the access point failed")]
    AssociationFailed,
}

/// One observation of the radio driver during the join phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinPoll {
    /// Still associating or waiting for an address.
    Joining,
    /// Associated and addressed.
    Joined,
    /// A status the driver reports as non-joinable.
    TerminalFailure(JoinFailure),
}

/// Explicit state machine for the startup join sequence.
///
/// `begin` moves to `Connecting`; each `on_poll` consumes one driver
/// observation and returns the resulting state. `Connected` and
/// `Failed` are absorbing.
#[derive(Debug)]
pub struct JoinSupervisor {
    state: ConnectionState,
    polls: u32,
    failure: Option<JoinFailure>,
}

impl JoinSupervisor {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            polls: 0,
            failure: None,
        }
    }

    /// Record that a join was requested from the radio.
    pub fn begin(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Consume one poll observation and return the new state.
    pub fn on_poll(&mut self, poll: JoinPoll) -> ConnectionState {
        // Terminal states absorb every later observation.
        if matches!(self.state, ConnectionState::Connected | ConnectionState::Failed) {
            return self.state;
        }
        self.polls += 1;
        self.state = match poll {
            JoinPoll::Joining => ConnectionState::Connecting,
            JoinPoll::Joined => ConnectionState::Connected,
            JoinPoll::TerminalFailure(reason) => {
                self.failure = Some(reason);
                ConnectionState::Failed
            }
        };
        self.state
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of poll observations consumed so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// The terminal failure reason, once `Failed`.
    pub fn failure(&self) -> Option<JoinFailure> {
        self.failure
    }
}

impl Default for JoinSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connects_on_exactly_the_third_poll() {
        let mut sup = JoinSupervisor::new();
        sup.begin();
        assert_eq!(sup.state(), ConnectionState::Connecting);

        assert_eq!(sup.on_poll(JoinPoll::Joining), ConnectionState::Connecting);
        assert_eq!(sup.on_poll(JoinPoll::Joining), ConnectionState::Connecting);
        assert_eq!(sup.on_poll(JoinPoll::Joined), ConnectionState::Connected);
        assert_eq!(sup.polls(), 3);
    }

    #[test]
    fn terminal_status_fails_at_any_poll() {
        for fail_at in 0..3usize {
            let mut sup = JoinSupervisor::new();
            sup.begin();
            for _ in 0..fail_at {
                sup.on_poll(JoinPoll::Joining);
            }
            let state = sup.on_poll(JoinPoll::TerminalFailure(JoinFailure::AssociationFailed));
            assert_eq!(state, ConnectionState::Failed);
            assert_eq!(sup.failure(), Some(JoinFailure::AssociationFailed));
        }
    }

    #[test]
    fn failed_is_absorbing() {
        let mut sup = JoinSupervisor::new();
        sup.begin();
        sup.on_poll(JoinPoll::TerminalFailure(JoinFailure::RadioFailure));
        // Even an apparently successful later observation cannot revive it.
        assert_eq!(sup.on_poll(JoinPoll::Joined), ConnectionState::Failed);
        assert_eq!(sup.state(), ConnectionState::Failed);
    }

    #[test]
    fn connected_is_absorbing() {
        let mut sup = JoinSupervisor::new();
        sup.begin();
        sup.on_poll(JoinPoll::Joined);
        assert_eq!(
            sup.on_poll(JoinPoll::TerminalFailure(JoinFailure::AssociationFailed)),
            ConnectionState::Connected
        );
        assert_eq!(sup.polls(), 1);
    }
}
