//! The caller-facing session handle.

use crate::{
    bus::{BusCloser, EventStream},
    error::{LiveError, Result},
    flag::OneShot,
    wire::WireConnection,
};
use live_types::{ClientMessage, LiveConfig, ProtocolAdapter, ToolSchema, Vendor};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, Ordering},
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Connected = 1,
    Disconnected = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Connected,
            _ => SessionState::Disconnected,
        }
    }
}

/// State shared between the session handle, its handshake and its inbound task.
///
/// The handle owns the only strong reference; everything else holds a `Weak`.
pub(crate) struct SessionShared {
    id: String,
    vendor: Vendor,
    adapter: Arc<dyn ProtocolAdapter>,
    wire: Arc<dyn WireConnection>,
    tools: Vec<ToolSchema>,
    state: AtomicU8,
    resumption_handle: Mutex<Option<String>>,
    disconnect_reason: Mutex<Option<String>>,
    closed: OneShot,
    bus: BusCloser,
    /// Dropped with the last strong handle, which wakes the inbound task.
    _alive: oneshot::Sender<()>,
}

/// Resolves once the last strong handle to a session is gone.
pub(crate) type HandleDropped = oneshot::Receiver<()>;

impl SessionShared {
    pub(crate) fn new(
        id: String,
        adapter: Arc<dyn ProtocolAdapter>,
        wire: Arc<dyn WireConnection>,
        tools: Vec<ToolSchema>,
        bus: BusCloser,
    ) -> (Self, HandleDropped) {
        let (alive, dropped) = oneshot::channel();
        let shared = Self {
            id,
            vendor: adapter.vendor(),
            adapter,
            wire,
            tools,
            state: AtomicU8::new(SessionState::Connecting as u8),
            resumption_handle: Mutex::new(None),
            disconnect_reason: Mutex::new(None),
            closed: OneShot::new(),
            bus,
            _alive: alive,
        };
        (shared, dropped)
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Called once the handshake reaches ready.
    pub(crate) fn mark_connected(&self) {
        if self
            .state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Connected as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            debug!(session_id = %self.id, "Session marked connected");
        }
    }

    /// Records why the session ended. Only the first reason is kept.
    pub(crate) fn mark_disconnected(&self, reason: impl Into<String>) {
        let previous = self.state.swap(SessionState::Disconnected as u8, Ordering::AcqRel);
        if previous != SessionState::Disconnected as u8 {
            let reason = reason.into();
            info!(session_id = %self.id, vendor = %self.vendor, %reason, "Session disconnected");
            if let Ok(mut slot) = self.disconnect_reason.lock() {
                slot.get_or_insert(reason);
            }
        }
    }

    pub(crate) fn set_resumption_handle(&self, handle: &str) {
        debug!(session_id = %self.id, "Resumption handle updated");
        if let Ok(mut slot) = self.resumption_handle.lock() {
            *slot = Some(handle.to_string());
        }
    }

    pub(crate) fn bus(&self) -> &BusCloser {
        &self.bus
    }
}

/// A ready live session.
///
/// Returned by [`LiveModel::connect`](crate::LiveModel::connect) only once
/// the vendor handshake has completed. Dropping the handle closes the
/// connection without the vendor's close frames; call [`close`](Self::close)
/// for a graceful shutdown.
pub struct LiveSession {
    shared: Arc<SessionShared>,
    events: Mutex<Option<EventStream>>,
}

impl LiveSession {
    pub(crate) fn new(shared: Arc<SessionShared>, events: EventStream) -> Self {
        Self {
            shared,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn vendor(&self) -> Vendor {
        self.shared.vendor
    }

    pub fn provider_name(&self) -> &'static str {
        self.shared.vendor.name()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Connected && self.shared.wire.is_open()
    }

    /// Sends an application message.
    ///
    /// Message kinds the vendor does not support are discarded and reported as
    /// success.
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        if self.state() != SessionState::Connected {
            return Err(LiveError::NotConnected);
        }
        match self.shared.adapter.encode_application_message(&message)? {
            Some(frame) => self.shared.wire.send(frame).await,
            None => {
                debug!(
                    session_id = %self.shared.id,
                    vendor = %self.shared.vendor,
                    kind = message.kind(),
                    "Message kind not supported by vendor; discarded"
                );
                Ok(())
            }
        }
    }

    /// The session's event stream, without handshake traffic.
    ///
    /// There is a single consumer: only the first call returns the stream.
    pub fn events(&self) -> Option<EventStream> {
        self.events.lock().ok().and_then(|mut events| events.take())
    }

    /// Re-sends the session configuration. A no-op for vendors that fix it at
    /// session start.
    pub async fn update_config(&self, config: &LiveConfig) -> Result<()> {
        if !self.shared.adapter.supports_config_update() {
            debug!(vendor = %self.shared.vendor, "Vendor does not support config updates; ignored");
            return Ok(());
        }
        if self.state() != SessionState::Connected {
            return Err(LiveError::NotConnected);
        }
        match self.shared.adapter.build_session_config(config, &self.shared.tools)? {
            Some(frame) => self.shared.wire.send(frame).await,
            None => Ok(()),
        }
    }

    /// Closes the connection and completes the event stream. Safe to call more than once.
    pub async fn close(&self) {
        if !self.shared.closed.fire() {
            return;
        }
        info!(session_id = %self.shared.id, vendor = %self.shared.vendor, "Closing session");

        if self.shared.wire.is_open() {
            for frame in self.shared.adapter.build_close() {
                if let Err(e) = self.shared.wire.send(frame).await {
                    warn!(error = %e, "Failed to send close frame");
                    break;
                }
            }
        }
        self.shared.wire.close().await;
        self.shared.mark_disconnected("closed by client");
        self.shared.bus.complete();
    }

    /// The vendor-issued token for resuming this conversation, if any.
    pub fn resumption_handle(&self) -> Option<String> {
        self.shared.resumption_handle.lock().ok().and_then(|h| h.clone())
    }

    /// Why the session ended, once it has.
    pub fn disconnect_reason(&self) -> Option<String> {
        self.shared.disconnect_reason.lock().ok().and_then(|r| r.clone())
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.shared.id)
            .field("vendor", &self.shared.vendor)
            .field("state", &self.state())
            .finish()
    }
}
