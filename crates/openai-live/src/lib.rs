//! OpenAI Realtime adapter.
//!
//! - `codec`: the OpenAI-style JSON event codec, shared with compatible vendors.
//! - `adapter`: the handshake table and [`ProtocolAdapter`](live_types::ProtocolAdapter) impl.
//! - `endpoint`: URL and auth headers.

pub mod adapter;
pub mod codec;
pub mod endpoint;

pub use adapter::OpenAiAdapter;
pub use codec::{CodecProfile, RealtimeCodec};
pub use endpoint::{DEFAULT_MODEL, endpoint};
