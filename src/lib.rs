//! One session API over several real-time speech model vendors.
//!
//! Most callers only need [`LiveModel`] and [`LiveSession`]; the vendor crates
//! are re-exported for code that wants an adapter directly.

pub use live_session::{
    ConfigError, Delivery, EventStream, LiveError, LiveModel, LiveSession, ModelConfig,
    OverflowPolicy, Result, SessionState,
};
pub use live_types::{
    ClientMessage, ContentDelta, DialogTurn, EventKind, EventPayload, LiveConfig, LiveEvent,
    Modality, Role, ToolCall, ToolSchema, TurnDetection, Vendor,
};

pub use doubao_live as doubao;
pub use gemini_live as gemini;
pub use live_session as session;
pub use live_types as types;
pub use openai_live as openai;
pub use qwen_live as qwen;
