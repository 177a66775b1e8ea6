//! Shared types for the live session layer.
//!
//! Every vendor crate speaks in terms of these types, so the session engine can
//! drive any of them through the same [`ProtocolAdapter`] contract:
//!
//! - `config`: caller-supplied session configuration and tool schemas.
//! - `event`: the canonical [`LiveEvent`] decoded from inbound frames.
//! - `message`: application messages a caller can send once a session is ready.
//! - `frame`: transport-level frames and connection requests.
//! - `handshake`: the data-driven handshake tables each vendor declares.
//! - `adapter`: the per-vendor encode/decode contract.

pub mod adapter;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod vendor;

pub use adapter::ProtocolAdapter;
pub use config::{DialogTurn, LiveConfig, Modality, Role, ToolSchema, TurnDetection};
pub use error::{AdapterError, Result};
pub use event::{ContentDelta, EventKind, EventPayload, LiveEvent, ProviderMetadata, ToolCall};
pub use frame::{CloseInfo, Frame, WireRequest};
pub use handshake::{HandshakeState, HandshakeStep, HandshakeTable, Transition};
pub use message::ClientMessage;
pub use vendor::Vendor;
