//! An in-process transport.
//!
//! [`MemoryConnector::pair`] returns a connector that hands out a single
//! connection, plus the [`MemoryPeer`] playing the server: it pushes inbound
//! frames and observes everything the session sends.

use super::{Connector, InboundStream, WireConnection};
use crate::{
    error::{LiveError, Result},
    flag::{OneShot, raised},
};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use live_types::{CloseInfo, Frame, WireRequest};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{mpsc, watch};

enum Inbound {
    Frame(Result<Frame>),
    End,
}

pub struct MemoryWire {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: Mutex<Option<InboundStream>>,
    open: Arc<AtomicBool>,
    closing: OneShot,
    closed_signal: watch::Sender<bool>,
    close_info: Mutex<Option<CloseInfo>>,
}

impl MemoryWire {
    fn set_close_info(&self, info: CloseInfo) {
        if let Ok(mut slot) = self.close_info.lock() {
            slot.get_or_insert(info);
        }
    }
}

#[async_trait]
impl WireConnection for MemoryWire {
    async fn send(&self, frame: Frame) -> Result<()> {
        if !self.is_open() {
            return Err(LiveError::Closed);
        }
        self.outbound.send(frame).map_err(|_| LiveError::Closed)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn close(&self) {
        if self.closing.fire() {
            self.open.store(false, Ordering::Release);
            self.closed_signal.send_replace(true);
        }
    }

    fn close_info(&self) -> Option<CloseInfo> {
        self.close_info.lock().ok().and_then(|info| info.clone())
    }

    fn take_inbound(&self) -> Option<InboundStream> {
        self.inbound.lock().ok().and_then(|mut inbound| inbound.take())
    }
}

/// Hands out the paired [`MemoryWire`] on the first `open` and records every request.
pub struct MemoryConnector {
    wire: Mutex<Option<Arc<MemoryWire>>>,
    requests: Arc<Mutex<Vec<WireRequest>>>,
}

impl MemoryConnector {
    pub fn pair() -> (MemoryConnector, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let open = Arc::new(AtomicBool::new(true));

        // The wire reads as closed once the session has consumed the end of the stream.
        let reader_open = open.clone();
        let inbound = stream::unfold(
            Some((inbound_rx, closed_rx)),
            move |state: Option<(mpsc::UnboundedReceiver<Inbound>, watch::Receiver<bool>)>| {
                let open = reader_open.clone();
                async move {
                    let (mut rx, mut closed) = state?;
                    tokio::select! {
                        biased;
                        _ = raised(&mut closed) => None,
                        next = rx.recv() => match next {
                            Some(Inbound::Frame(Ok(frame))) => Some((Ok(frame), Some((rx, closed)))),
                            Some(Inbound::Frame(Err(error))) => {
                                open.store(false, Ordering::Release);
                                Some((Err(error), None))
                            }
                            Some(Inbound::End) | None => {
                                open.store(false, Ordering::Release);
                                None
                            }
                        },
                    }
                }
            },
        )
        .boxed();

        let wire = Arc::new(MemoryWire {
            outbound: outbound_tx,
            inbound: Mutex::new(Some(inbound)),
            open,
            closing: OneShot::new(),
            closed_signal: closed_tx,
            close_info: Mutex::new(None),
        });
        let requests = Arc::new(Mutex::new(Vec::new()));

        let peer = MemoryPeer {
            wire: wire.clone(),
            inbound: inbound_tx,
            outbound: tokio::sync::Mutex::new(outbound_rx),
            requests: requests.clone(),
        };
        let connector = MemoryConnector {
            wire: Mutex::new(Some(wire)),
            requests,
        };
        (connector, peer)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, request: WireRequest) -> Result<Arc<dyn WireConnection>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let wire = self
            .wire
            .lock()
            .ok()
            .and_then(|mut wire| wire.take())
            .ok_or_else(|| LiveError::Transport("memory connection already used".to_string()))?;
        Ok(wire as Arc<dyn WireConnection>)
    }
}

/// The server side of a [`MemoryConnector`] pair.
pub struct MemoryPeer {
    wire: Arc<MemoryWire>,
    inbound: mpsc::UnboundedSender<Inbound>,
    outbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    requests: Arc<Mutex<Vec<WireRequest>>>,
}

impl MemoryPeer {
    /// Delivers a frame to the session.
    pub fn push(&self, frame: impl Into<Frame>) {
        let _ = self.inbound.send(Inbound::Frame(Ok(frame.into())));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Frame::Text(text.into()));
    }

    pub fn push_binary(&self, data: impl Into<bytes::Bytes>) {
        self.push(Frame::Binary(data.into()));
    }

    /// Fails the inbound stream with a transport error.
    pub fn push_error(&self, error: LiveError) {
        let _ = self.inbound.send(Inbound::Frame(Err(error)));
    }

    /// Ends the inbound stream as if the server closed the connection.
    pub fn finish(&self, info: Option<CloseInfo>) {
        if let Some(info) = info {
            self.wire.set_close_info(info);
        }
        let _ = self.inbound.send(Inbound::End);
    }

    /// The next frame the session sent, waiting for one if needed.
    /// `None` once the session side is gone and everything was read.
    pub async fn recv(&self) -> Option<Frame> {
        self.outbound.lock().await.recv().await
    }

    /// Every frame sent so far that has not been read yet.
    pub async fn drain(&self) -> Vec<Frame> {
        let mut outbound = self.outbound.lock().await;
        let mut frames = Vec::new();
        while let Ok(frame) = outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Whether the session closed its side of the connection.
    pub fn is_closed(&self) -> bool {
        self.wire.closing.is_fired()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}
