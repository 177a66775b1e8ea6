//! Data-driven handshake tables.
//!
//! Each vendor declares its handshake as a static [`HandshakeTable`]; the
//! session engine runs one generic state machine over whichever table the
//! adapter hands it. Two shapes exist in practice:
//!
//! - a single round trip (`AwaitingFirstAck -> Ready`, optionally with a
//!   config message sent in between), and
//! - two round trips (`AwaitingFirstAck -> AwaitingSecondAck -> Ready`), where
//!   the second outbound message is only sent after the first acknowledgment.

use crate::event::EventKind;

/// Per-connection handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeState {
    AwaitingFirstAck = 0,
    AwaitingSecondAck = 1,
    Ready = 2,
    Failed = 3,
    Closed = 4,
}

impl HandshakeState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => HandshakeState::AwaitingFirstAck,
            1 => HandshakeState::AwaitingSecondAck,
            2 => HandshakeState::Ready,
            3 => HandshakeState::Failed,
            _ => HandshakeState::Closed,
        }
    }

    /// `Failed` and `Closed` are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Failed | HandshakeState::Closed)
    }
}

/// An outbound handshake message, built by the adapter on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// `build_handshake_open`
    Open,
    /// `build_session_config`
    SessionConfig,
    /// `build_start_session`
    StartSession,
}

/// A single edge of the handshake state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The inbound marker that triggers this edge.
    pub on: EventKind,
    pub from: HandshakeState,
    pub to: HandshakeState,
    /// Sent exactly once when the edge is taken.
    pub send: Option<HandshakeStep>,
    /// Store the event's resumption handle on the session.
    pub capture_resumption: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTable {
    /// Sent as soon as the connection opens; `None` waits for the server to speak first.
    pub on_open: Option<HandshakeStep>,
    pub transitions: &'static [Transition],
    /// Vendor-reported failures that abort the handshake.
    pub failures: &'static [EventKind],
    /// Internal handshake events that are never forwarded to callers.
    pub markers: &'static [EventKind],
}

impl HandshakeTable {
    pub fn transition_for(&self, kind: EventKind) -> Option<(usize, &'static Transition)> {
        self.transitions.iter().enumerate().find(|(_, t)| t.on == kind)
    }

    pub fn is_marker(&self, kind: EventKind) -> bool {
        self.markers.contains(&kind)
    }

    /// Whether `kind` aborts the handshake while it is still in progress.
    pub fn is_failure(&self, kind: EventKind) -> bool {
        kind == EventKind::Error || self.failures.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: HandshakeTable = HandshakeTable {
        on_open: None,
        transitions: &[
            Transition {
                on: EventKind::SessionCreated,
                from: HandshakeState::AwaitingFirstAck,
                to: HandshakeState::AwaitingSecondAck,
                send: Some(HandshakeStep::SessionConfig),
                capture_resumption: false,
            },
            Transition {
                on: EventKind::SessionUpdated,
                from: HandshakeState::AwaitingSecondAck,
                to: HandshakeState::Ready,
                send: None,
                capture_resumption: false,
            },
        ],
        failures: &[],
        markers: &[EventKind::SessionCreated, EventKind::SessionUpdated],
    };

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            HandshakeState::AwaitingFirstAck,
            HandshakeState::AwaitingSecondAck,
            HandshakeState::Ready,
            HandshakeState::Failed,
            HandshakeState::Closed,
        ] {
            assert_eq!(HandshakeState::from_u8(state as u8), state);
        }
        assert!(HandshakeState::Failed.is_terminal());
        assert!(!HandshakeState::Ready.is_terminal());
    }

    #[test]
    fn test_table_lookup() {
        let (index, transition) = SINGLE
            .transition_for(EventKind::SessionUpdated)
            .expect("transition exists");
        assert_eq!(index, 1);
        assert_eq!(transition.to, HandshakeState::Ready);
        assert!(SINGLE.transition_for(EventKind::Content).is_none());
        assert!(SINGLE.is_marker(EventKind::SessionCreated));
        assert!(SINGLE.is_failure(EventKind::Error));
        assert!(!SINGLE.is_failure(EventKind::SessionFailed));
    }
}
