//! Vendor-neutral live sessions over persistent WebSocket connections.
//!
//! [`LiveModel::connect`] opens a connection, runs the vendor's handshake to
//! completion and hands back a ready [`LiveSession`]. From then on the session
//! exposes the same surface for every vendor: `send`, `events`,
//! `update_config`, `close`.

pub mod bus;
pub mod config;
pub mod error;
mod flag;
mod handshake;
pub mod orchestrator;
mod registry;
pub mod session;
pub mod wire;

pub use bus::{Delivery, EventStream, OverflowPolicy};
pub use config::{ConfigError, ModelConfig};
pub use error::{LiveError, Result};
pub use orchestrator::LiveModel;
pub use session::{LiveSession, SessionState};
pub use wire::{
    Connector, InboundStream, WireConnection,
    memory::{MemoryConnector, MemoryPeer},
    tungstenite::TungsteniteConnector,
};
