//! Doubao realtime dialogue adapter (Volcengine).
//!
//! Unlike the JSON vendors this protocol is binary framed and takes two round
//! trips to become ready: `StartConnection -> ConnectionStarted`, then
//! `StartSession -> SessionStarted`. The session-started payload carries the
//! `dialog_id` used to resume the conversation later.

pub mod adapter;
pub mod endpoint;
pub mod frame;
pub mod protocol;
pub mod scrape;

pub use adapter::DoubaoAdapter;
pub use endpoint::endpoint;
pub use frame::RawFrame;
