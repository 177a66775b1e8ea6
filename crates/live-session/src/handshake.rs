//! Drives a vendor's [`HandshakeTable`] from connection open to ready.

use crate::{
    error::{LiveError, Result},
    flag::OneShot,
    session::SessionShared,
    wire::WireConnection,
};
use live_types::{
    HandshakeState, HandshakeStep, HandshakeTable, LiveConfig, LiveEvent, ProtocolAdapter,
    ToolSchema,
};
use std::sync::{
    Arc, Weak,
    atomic::{AtomicU8, Ordering},
};
use tracing::debug;

/// The outcome of feeding one event to the coordinator.
#[derive(Debug)]
pub(crate) enum Progress {
    /// Still waiting on the vendor.
    Pending,
    /// The handshake completed with this event.
    Ready,
    /// The handshake failed; the connection cannot be used.
    Failed(LiveError),
}

pub(crate) struct HandshakeCoordinator {
    adapter: Arc<dyn ProtocolAdapter>,
    wire: Arc<dyn WireConnection>,
    config: LiveConfig,
    tools: Vec<ToolSchema>,
    table: &'static HandshakeTable,
    state: AtomicU8,
    open_sent: OneShot,
    /// One guard per transition, so each outbound step is sent at most once.
    sent: Vec<OneShot>,
    session: Weak<SessionShared>,
}

impl HandshakeCoordinator {
    pub(crate) fn new(
        adapter: Arc<dyn ProtocolAdapter>,
        wire: Arc<dyn WireConnection>,
        config: LiveConfig,
        tools: Vec<ToolSchema>,
        session: Weak<SessionShared>,
    ) -> Self {
        let table = adapter.handshake();
        Self {
            adapter,
            wire,
            config,
            tools,
            table,
            state: AtomicU8::new(HandshakeState::AwaitingFirstAck as u8),
            open_sent: OneShot::new(),
            sent: table.transitions.iter().map(|_| OneShot::new()).collect(),
            session,
        }
    }

    pub(crate) fn state(&self) -> HandshakeState {
        HandshakeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Sends the vendor's opening message, if it has one.
    pub(crate) async fn start(&self) -> Result<()> {
        let Some(step) = self.table.on_open else {
            debug!(vendor = %self.adapter.vendor(), "Waiting for the server to open the handshake");
            return Ok(());
        };
        if !self.open_sent.fire() {
            return Ok(());
        }
        if let Err(e) = self.send_step(step).await {
            self.fail();
            return Err(e);
        }
        Ok(())
    }

    /// Advances the state machine with one decoded inbound event.
    ///
    /// Events that match no transition from the current state leave it
    /// unchanged, which makes duplicate and out-of-order markers harmless.
    pub(crate) async fn on_event(&self, event: &LiveEvent) -> Progress {
        let state = self.state();
        match state {
            HandshakeState::Ready => return Progress::Ready,
            HandshakeState::Failed | HandshakeState::Closed => {
                return Progress::Failed(self.failure("handshake already terminated"));
            }
            _ => {}
        }

        let kind = event.kind();
        if self.table.is_failure(kind) {
            self.fail();
            let reason = event
                .failure_reason()
                .unwrap_or_else(|| format!("server reported {kind:?}"));
            return Progress::Failed(self.failure(reason));
        }

        let Some((index, transition)) = self.table.transition_for(kind) else {
            return Progress::Pending;
        };
        if transition.from != state {
            debug!(?kind, ?state, "Handshake event out of order; ignored");
            return Progress::Pending;
        }
        if !self.sent[index].fire() {
            debug!(?kind, "Duplicate handshake event; ignored");
            return Progress::Pending;
        }

        if transition.capture_resumption {
            if let (Some(handle), Some(session)) = (event.resumption_handle(), self.session.upgrade()) {
                session.set_resumption_handle(handle);
            }
        }

        if let Some(step) = transition.send {
            if let Err(e) = self.send_step(step).await {
                self.fail();
                return Progress::Failed(e);
            }
        }

        if self
            .state
            .compare_exchange(state as u8, transition.to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Progress::Failed(self.failure("handshake state changed concurrently"));
        }
        debug!(vendor = %self.adapter.vendor(), from = ?state, to = ?transition.to, "Handshake advanced");

        if transition.to == HandshakeState::Ready {
            if let Some(session) = self.session.upgrade() {
                session.mark_connected();
            }
            return Progress::Ready;
        }
        Progress::Pending
    }

    /// Moves to `Failed` unless the handshake already finished.
    pub(crate) fn fail(&self) {
        let _ = self.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            match HandshakeState::from_u8(current) {
                HandshakeState::AwaitingFirstAck | HandshakeState::AwaitingSecondAck => {
                    Some(HandshakeState::Failed as u8)
                }
                _ => None,
            }
        });
    }

    pub(crate) fn failure(&self, reason: impl Into<String>) -> LiveError {
        LiveError::Handshake {
            vendor: self.adapter.vendor(),
            reason: reason.into(),
        }
    }

    async fn send_step(&self, step: HandshakeStep) -> Result<()> {
        let frame = match step {
            HandshakeStep::Open => self.adapter.build_handshake_open(&self.config, &self.tools),
            HandshakeStep::SessionConfig => self.adapter.build_session_config(&self.config, &self.tools),
            HandshakeStep::StartSession => self
                .adapter
                .build_start_session(&self.config, self.config.resumption_handle.as_deref()),
        }?;
        match frame {
            Some(frame) => {
                debug!(?step, bytes = frame.len(), "Sending handshake message");
                self.wire.send(frame).await
            }
            None => Ok(()),
        }
    }
}
