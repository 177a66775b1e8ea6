//! Gemini Live adapter (`BidiGenerateContent`).
//!
//! Gemini authenticates with a query-string key and expects the client to
//! speak first: the `setup` message goes out as soon as the socket opens and
//! the session is ready on `setupComplete`.

pub mod adapter;
pub mod endpoint;
mod types;

pub use adapter::GeminiAdapter;
pub use endpoint::{DEFAULT_MODEL, endpoint};
