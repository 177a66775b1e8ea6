//! The canonical event every vendor adapter decodes into.

use crate::config::Role;
use bytes::Bytes;
use serde_json::Value;

/// A decoded inbound frame.
///
/// Events are immutable once built and are only produced by an adapter's
/// `decode` call. `metadata` keeps the vendor's own identifiers (event type,
/// event id, and for control events the raw payload) for callers that need them.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEvent {
    pub payload: EventPayload,
    pub metadata: ProviderMetadata,
}

/// The decoded body of a [`LiveEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// The server acknowledged the connection and created a session.
    SessionCreated { session_id: Option<String> },
    /// The server applied a session configuration.
    SessionUpdated,
    /// Binary protocol: the connection-level handshake succeeded.
    ConnectionStarted,
    /// Binary protocol: the connection-level handshake was rejected.
    ConnectionFailed { reason: String },
    /// Binary protocol: the session-level handshake succeeded.
    SessionStarted { dialog_id: Option<String> },
    /// Binary protocol: the session-level handshake was rejected.
    SessionFailed { reason: String },
    /// A chunk of model output.
    Content(ContentDelta),
    /// A transcription of user or model speech.
    Transcript { role: Role, text: String, is_final: bool },
    /// The model asked for one or more functions to be called.
    ToolCall { calls: Vec<ToolCall> },
    SpeechStarted,
    SpeechStopped,
    TurnComplete,
    /// The model's response was cut off by user speech.
    Interrupted,
    /// The vendor issued a fresh resumption handle mid-session.
    ResumptionUpdate { handle: String },
    /// The server will close the connection soon.
    GoAway { time_left: Option<String> },
    Error { code: Option<String>, message: String },
    Closed { reason: String },
    /// A well-formed frame this layer does not interpret.
    Other,
}

/// Fieldless discriminant of [`EventPayload`], used by handshake tables and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionCreated,
    SessionUpdated,
    ConnectionStarted,
    ConnectionFailed,
    SessionStarted,
    SessionFailed,
    Content,
    Transcript,
    ToolCall,
    SpeechStarted,
    SpeechStopped,
    TurnComplete,
    Interrupted,
    ResumptionUpdate,
    GoAway,
    Error,
    Closed,
    Other,
}

/// Text and/or audio produced by the model in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDelta {
    pub text: Option<String>,
    /// Raw audio bytes, already unwrapped from any transport encoding.
    pub audio: Option<Bytes>,
    /// The vendor flagged this frame as the last one of the model's turn.
    pub end_of_turn: bool,
}

impl ContentDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn audio(audio: impl Into<Bytes>) -> Self {
        Self {
            audio: Some(audio.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    /// The function arguments as JSON text.
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderMetadata {
    pub event_type: Option<String>,
    pub event_id: Option<String>,
    pub raw: Option<Value>,
}

impl LiveEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            metadata: ProviderMetadata::default(),
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.metadata.event_type = Some(event_type.into());
        self
    }

    pub fn with_event_id(mut self, event_id: Option<String>) -> Self {
        self.metadata.event_id = event_id;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.metadata.raw = Some(raw);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// The resumption handle carried by this event, if any.
    pub fn resumption_handle(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::SessionStarted { dialog_id } => dialog_id.as_deref(),
            EventPayload::ResumptionUpdate { handle } => Some(handle),
            _ => None,
        }
    }

    /// A human-readable reason for failure-type events.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.payload {
            EventPayload::ConnectionFailed { reason } | EventPayload::SessionFailed { reason } => {
                Some(reason.clone())
            }
            EventPayload::Error { code: Some(code), message } => Some(format!("{code}: {message}")),
            EventPayload::Error { code: None, message } => Some(message.clone()),
            _ => None,
        }
    }
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::SessionCreated { .. } => EventKind::SessionCreated,
            EventPayload::SessionUpdated => EventKind::SessionUpdated,
            EventPayload::ConnectionStarted => EventKind::ConnectionStarted,
            EventPayload::ConnectionFailed { .. } => EventKind::ConnectionFailed,
            EventPayload::SessionStarted { .. } => EventKind::SessionStarted,
            EventPayload::SessionFailed { .. } => EventKind::SessionFailed,
            EventPayload::Content(_) => EventKind::Content,
            EventPayload::Transcript { .. } => EventKind::Transcript,
            EventPayload::ToolCall { .. } => EventKind::ToolCall,
            EventPayload::SpeechStarted => EventKind::SpeechStarted,
            EventPayload::SpeechStopped => EventKind::SpeechStopped,
            EventPayload::TurnComplete => EventKind::TurnComplete,
            EventPayload::Interrupted => EventKind::Interrupted,
            EventPayload::ResumptionUpdate { .. } => EventKind::ResumptionUpdate,
            EventPayload::GoAway { .. } => EventKind::GoAway,
            EventPayload::Error { .. } => EventKind::Error,
            EventPayload::Closed { .. } => EventKind::Closed,
            EventPayload::Other => EventKind::Other,
        }
    }
}

impl From<EventPayload> for LiveEvent {
    fn from(payload: EventPayload) -> Self {
        LiveEvent::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resumption_handle_sources() {
        let started = LiveEvent::new(EventPayload::SessionStarted {
            dialog_id: Some("abc123".into()),
        });
        assert_eq!(started.resumption_handle(), Some("abc123"));

        let update = LiveEvent::new(EventPayload::ResumptionUpdate {
            handle: "h-2".into(),
        });
        assert_eq!(update.resumption_handle(), Some("h-2"));

        let content = LiveEvent::new(EventPayload::Content(ContentDelta::text("hi")));
        assert_eq!(content.resumption_handle(), None);
    }

    #[test]
    fn test_failure_reason_includes_code() {
        let err = LiveEvent::new(EventPayload::Error {
            code: Some("invalid_api_key".into()),
            message: "bad key".into(),
        });
        assert_eq!(err.failure_reason().as_deref(), Some("invalid_api_key: bad key"));
        assert_eq!(err.kind(), EventKind::Error);
    }
}
