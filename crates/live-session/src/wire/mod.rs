//! The transport seam.
//!
//! A [`Connector`] opens a [`WireConnection`] from a vendor's
//! [`WireRequest`]. The session engine only ever talks to these two traits,
//! so the real WebSocket transport and the in-memory one used in tests are
//! interchangeable.

pub mod memory;
pub mod tungstenite;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use live_types::{CloseInfo, Frame, WireRequest};
use std::sync::Arc;

/// Inbound frames in arrival order. A transport error is the last item.
pub type InboundStream = BoxStream<'static, Result<Frame>>;

/// An opened duplex connection. `send` is safe to call concurrently with the
/// inbound stream being read.
#[async_trait]
pub trait WireConnection: Send + Sync {
    async fn send(&self, frame: Frame) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Closes the connection. Calling it again is a no-op.
    async fn close(&self);

    /// The peer's close code and reason, once the peer has closed.
    fn close_info(&self) -> Option<CloseInfo>;

    /// Hands out the inbound stream. Only the first call returns it.
    fn take_inbound(&self) -> Option<InboundStream>;
}

/// Opens connections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, request: WireRequest) -> Result<Arc<dyn WireConnection>>;
}
