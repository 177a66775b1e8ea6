//! WebSocket transport on `tokio-tungstenite`.

use super::{Connector, InboundStream, WireConnection};
use crate::{
    error::{LiveError, Result},
    flag::OneShot,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use futures_util::{SinkExt, stream::SplitSink};
use live_types::{CloseInfo, Frame, WireRequest};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderName, HeaderValue},
        protocol::Message,
    },
};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn open(&self, request: WireRequest) -> Result<Arc<dyn WireConnection>> {
        let mut ws_request = request.url.as_str().into_client_request()?;
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LiveError::Transport(format!("invalid header name `{name}`: {e}")))?;
            // The value may be a credential; keep it out of the error.
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| LiveError::Transport(format!("invalid value for header `{name}`")))?;
            ws_request.headers_mut().insert(header_name, header_value);
        }

        let (stream, response) = connect_async(ws_request).await?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Arc::new(TungsteniteWire::new(stream)))
    }
}

pub struct TungsteniteWire {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    inbound: Mutex<Option<InboundStream>>,
    open: Arc<AtomicBool>,
    closing: OneShot,
    close_info: Arc<Mutex<Option<CloseInfo>>>,
}

impl TungsteniteWire {
    fn new(ws: WsStream) -> Self {
        let (sink, source) = ws.split();
        let open = Arc::new(AtomicBool::new(true));
        let close_info = Arc::new(Mutex::new(None));

        let reader_open = open.clone();
        let reader_close_info = close_info.clone();
        let inbound = stream::unfold(Some(source), move |source| {
            let open = reader_open.clone();
            let close_info = reader_close_info.clone();
            async move {
                let mut source = source?;
                loop {
                    match source.next().await {
                        Some(Ok(Message::Text(text))) => return Some((Ok(Frame::Text(text)), Some(source))),
                        Some(Ok(Message::Binary(data))) => {
                            return Some((Ok(Frame::Binary(Bytes::from(data))), Some(source)));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            open.store(false, Ordering::Release);
                            if let (Some(frame), Ok(mut slot)) = (frame, close_info.lock()) {
                                *slot = Some(CloseInfo {
                                    code: u16::from(frame.code),
                                    reason: frame.reason.into_owned(),
                                });
                            }
                            return None;
                        }
                        // Pings are answered by tungstenite itself.
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            open.store(false, Ordering::Release);
                            return Some((Err(LiveError::from(e)), None));
                        }
                        None => {
                            open.store(false, Ordering::Release);
                            return None;
                        }
                    }
                }
            }
        })
        .boxed();

        Self {
            sink: tokio::sync::Mutex::new(sink),
            inbound: Mutex::new(Some(inbound)),
            open,
            closing: OneShot::new(),
            close_info,
        }
    }
}

#[async_trait]
impl WireConnection for TungsteniteWire {
    async fn send(&self, frame: Frame) -> Result<()> {
        if !self.is_open() {
            return Err(LiveError::Closed);
        }
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data.to_vec()),
        };
        self.sink.lock().await.send(message).await.map_err(LiveError::from)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn close(&self) {
        if !self.closing.fire() {
            return;
        }
        // The peer may already have closed; the sink still needs its close frame flushed.
        self.open.store(false, Ordering::Release);
        if let Err(e) = self.sink.lock().await.close().await {
            debug!(error = %e, "WebSocket close did not complete cleanly");
        }
    }

    fn close_info(&self) -> Option<CloseInfo> {
        self.close_info.lock().ok().and_then(|info| info.clone())
    }

    fn take_inbound(&self) -> Option<InboundStream> {
        self.inbound.lock().ok().and_then(|mut inbound| inbound.take())
    }
}
