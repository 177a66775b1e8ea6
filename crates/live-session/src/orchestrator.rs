//! Opening sessions: connect, handshake, hand back a ready [`LiveSession`].

use crate::{
    bus::{self, Delivery, EventPublisher},
    config::ModelConfig,
    error::{LiveError, Result},
    handshake::{HandshakeCoordinator, Progress},
    registry,
    session::{HandleDropped, LiveSession, SessionShared},
    wire::{Connector, InboundStream, WireConnection, tungstenite::TungsteniteConnector},
};
use futures::StreamExt;
use live_types::{EventKind, Frame, LiveConfig, ProtocolAdapter, ToolSchema, Vendor};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, instrument, warn};
use uuid::Uuid;

/// A configured vendor model that live sessions are opened against.
pub struct LiveModel {
    config: ModelConfig,
    connector: Arc<dyn Connector>,
}

impl LiveModel {
    pub fn new(config: ModelConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    /// Uses `connector` instead of real WebSockets.
    pub fn with_connector(config: ModelConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ModelConfig::from_env()?))
    }

    pub fn vendor(&self) -> Vendor {
        self.config.vendor
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Opens a session with default configuration and no tools.
    pub async fn connect_default(&self) -> Result<LiveSession> {
        self.connect(LiveConfig::default(), Vec::new()).await
    }

    /// Opens a session without tools.
    pub async fn connect_with_config(&self, config: LiveConfig) -> Result<LiveSession> {
        self.connect(config, Vec::new()).await
    }

    /// Opens a connection and resolves once the vendor handshake is complete.
    ///
    /// Any failure before the session is ready fails this call and closes the
    /// connection. No timeout is applied; wrap the call in one if needed.
    #[instrument(name = "live_connect", skip_all, fields(vendor = %self.config.vendor, session_id))]
    pub async fn connect(&self, config: LiveConfig, tools: Vec<ToolSchema>) -> Result<LiveSession> {
        let session_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("session_id", session_id.as_str());

        let registry::Target { adapter, request } = registry::resolve(&self.config, &session_id)?;
        debug!(?request, "Opening connection");
        let wire = self.connector.open(request).await?;
        info!("Connection opened; starting handshake");

        let Some(inbound) = wire.take_inbound() else {
            wire.close().await;
            return Err(LiveError::Transport("connection has no inbound stream".to_string()));
        };

        let (publisher, events) = bus::channel(self.config.overflow, adapter.handshake().markers);
        let (shared, handle_dropped) = SessionShared::new(
            session_id.clone(),
            adapter.clone(),
            wire.clone(),
            tools.clone(),
            publisher.closer(),
        );
        let shared = Arc::new(shared);
        let coordinator = HandshakeCoordinator::new(
            adapter.clone(),
            wire.clone(),
            config,
            tools,
            Arc::downgrade(&shared),
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = InboundTask {
            inbound,
            coordinator,
            adapter,
            wire: wire.clone(),
            publisher,
            session: Arc::downgrade(&shared),
            handle_dropped,
            ready: Some(ready_tx),
        };
        let span = tracing::info_span!("live_session", %session_id, vendor = %self.config.vendor);
        tokio::spawn(task.run().instrument(span));

        let outcome = ready_rx.await.unwrap_or_else(|_| {
            Err(LiveError::Transport("inbound task ended before the session was ready".to_string()))
        });
        match outcome {
            Ok(()) => {
                info!("Session ready");
                Ok(LiveSession::new(shared, events))
            }
            Err(e) => {
                error!(error = %e, "Handshake failed; closing connection");
                wire.close().await;
                shared.mark_disconnected(e.to_string());
                Err(e)
            }
        }
    }
}

/// The per-connection inbound task: drives the handshake, then forwards events.
struct InboundTask {
    inbound: InboundStream,
    coordinator: HandshakeCoordinator,
    adapter: Arc<dyn ProtocolAdapter>,
    wire: Arc<dyn WireConnection>,
    publisher: EventPublisher,
    session: Weak<SessionShared>,
    /// Fires when `connect` is abandoned or the session handle is dropped.
    handle_dropped: HandleDropped,
    /// Present until the handshake resolves one way or the other.
    ready: Option<oneshot::Sender<Result<()>>>,
}

enum Wake {
    Inbound(Option<Result<Frame>>),
    Released,
}

impl InboundTask {
    async fn run(mut self) {
        if let Err(e) = self.coordinator.start().await {
            self.resolve(Err(e));
            return;
        }

        loop {
            let wake = tokio::select! {
                next = self.inbound.next() => Wake::Inbound(next),
                _ = &mut self.handle_dropped => Wake::Released,
            };
            let next = match wake {
                Wake::Inbound(Some(next)) => next,
                Wake::Inbound(None) => break,
                Wake::Released => {
                    self.release().await;
                    return;
                }
            };
            let Some(session) = self.session.upgrade() else {
                self.release().await;
                return;
            };

            let frame = match next {
                Ok(frame) => frame,
                Err(e) => {
                    if self.ready.is_some() {
                        self.coordinator.fail();
                        self.resolve(Err(e));
                    } else {
                        error!(error = %e, "Transport error");
                        session.mark_disconnected(e.to_string());
                        session.bus().fail(e);
                    }
                    return;
                }
            };

            let events = match self.adapter.decode_all(&frame) {
                Ok(events) => events,
                Err(e) if self.ready.is_some() => {
                    // Without a decodable frame the handshake state is unknown.
                    self.coordinator.fail();
                    let reason = format!("undecodable frame during handshake: {e}");
                    self.resolve(Err(self.coordinator.failure(reason)));
                    return;
                }
                Err(e) => {
                    warn!(error = %e, bytes = frame.len(), "Dropping malformed frame");
                    continue;
                }
            };

            for event in events {
                if self.ready.is_some() {
                    match self.coordinator.on_event(&event).await {
                        Progress::Pending => {}
                        Progress::Ready => self.resolve(Ok(())),
                        Progress::Failed(e) => {
                            self.resolve(Err(e));
                            return;
                        }
                    }
                } else if event.kind() == EventKind::ResumptionUpdate {
                    if let Some(handle) = event.resumption_handle() {
                        session.set_resumption_handle(handle);
                    }
                }

                match self.publisher.publish(event).await {
                    Delivery::Delivered | Delivery::Filtered => {}
                    Delivery::Dropped => warn!("Event buffer full; event dropped"),
                    Delivery::Closed => debug!("Event stream closed; event discarded"),
                }
            }
        }

        let reason = match self.wire.close_info() {
            Some(info) => format!("connection closed ({info})"),
            None => "connection closed".to_string(),
        };
        if self.ready.is_some() {
            self.coordinator.fail();
            let error = self.coordinator.failure(format!("{reason} before the session was ready"));
            self.resolve(Err(error));
            return;
        }
        if let Some(session) = self.session.upgrade() {
            session.mark_disconnected(reason);
        }
        self.publisher.closer().complete();
    }

    /// Nobody holds the session any more: close the connection and end the stream.
    async fn release(&mut self) {
        debug!("Session handle dropped; closing connection");
        self.coordinator.fail();
        self.wire.close().await;
        self.publisher.closer().complete();
    }

    fn resolve(&mut self, outcome: Result<()>) {
        if let Some(ready) = self.ready.take() {
            // The caller may have stopped waiting; nothing else to do then.
            let _ = ready.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{MockConnector, memory::MemoryConnector};
    use live_types::EventPayload;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_failure_fails_connect() {
        let mut connector = MockConnector::new();
        connector
            .expect_open()
            .times(1)
            .returning(|_| Err(LiveError::Transport("connection refused".into())));
        let model = LiveModel::with_connector(ModelConfig::openai("sk-test"), Arc::new(connector));

        let result = model.connect_default().await;
        assert!(matches!(result, Err(LiveError::Transport(ref msg)) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_missing_credentials_never_open() {
        let mut connector = MockConnector::new();
        connector.expect_open().never();
        let model = LiveModel::with_connector(ModelConfig::new(Vendor::Qwen), Arc::new(connector));

        let result = model.connect_default().await;
        assert!(matches!(result, Err(LiveError::Config(_))));
    }

    #[tokio::test]
    async fn test_decode_error_after_ready_is_dropped() {
        let (connector, peer) = MemoryConnector::pair();
        let model = LiveModel::with_connector(ModelConfig::openai("sk-test"), Arc::new(connector));

        peer.push_text(r#"{"type":"session.created","session":{"id":"sess_1"}}"#);
        peer.push_text(r#"{"type":"session.updated"}"#);
        let session = tokio::time::timeout(Duration::from_secs(1), model.connect_default())
            .await
            .expect("connect must not hang")
            .expect("connects");
        let mut events = session.events().expect("events");

        peer.push_text("{not json");
        peer.push_text(r#"{"type":"response.text.delta","delta":"hi"}"#);
        let event = events.next().await.expect("event").expect("ok");
        assert!(matches!(event.payload, EventPayload::Content(_)));
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn test_peer_close_ends_stream() {
        let (connector, peer) = MemoryConnector::pair();
        let model = LiveModel::with_connector(ModelConfig::gemini("g-key"), Arc::new(connector));

        peer.push_text(r#"{"setupComplete":{}}"#);
        let session = model.connect_default().await.expect("connects");
        let mut events = session.events().expect("events");

        peer.finish(Some(live_types::CloseInfo {
            code: 1000,
            reason: "bye".into(),
        }));
        assert!(events.next().await.is_none());
        assert_eq!(
            session.disconnect_reason().as_deref(),
            Some("connection closed (code 1000: bye)")
        );
        assert!(!session.is_open());
    }

    async fn wait_closed(peer: &crate::wire::memory::MemoryPeer) -> bool {
        for _ in 0..100 {
            if peer.is_closed() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_abandoned_connect_closes_connection() {
        let (connector, peer) = MemoryConnector::pair();
        let model = LiveModel::with_connector(ModelConfig::openai("sk-test"), Arc::new(connector));

        // The server never answers, so the caller's timeout abandons connect.
        let result = tokio::time::timeout(Duration::from_millis(50), model.connect_default()).await;
        assert!(result.is_err());
        assert!(wait_closed(&peer).await, "connection left open after connect was abandoned");
    }

    #[tokio::test]
    async fn test_dropped_session_closes_connection() {
        let (connector, peer) = MemoryConnector::pair();
        let model = LiveModel::with_connector(ModelConfig::gemini("g-key"), Arc::new(connector));

        peer.push_text(r#"{"setupComplete":{}}"#);
        let session = model.connect_default().await.expect("connects");
        let mut events = session.events().expect("events");
        drop(session);

        assert!(wait_closed(&peer).await, "connection left open after the session was dropped");
        let end = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await
            .expect("stream must not hang");
        assert!(end.is_none());
    }
}
