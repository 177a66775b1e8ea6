//! Protocol adapter for the Doubao realtime dialogue API.

use crate::{
    frame::RawFrame,
    protocol::{encode_frame, event, message_type, serialization},
    scrape::{bool_field, first_string_field, string_field},
};
use bytes::Bytes;
use live_types::{
    AdapterError, ClientMessage, ContentDelta, EventKind, EventPayload, Frame, HandshakeState,
    HandshakeStep, HandshakeTable, LiveConfig, LiveEvent, ProtocolAdapter, Result, Role,
    ToolSchema, Transition, Vendor,
};
use serde_json::{Map, Value, json};
use tracing::debug;

/// StartConnection on open, StartSession on `ConnectionStarted`, ready on `SessionStarted`.
pub const HANDSHAKE: HandshakeTable = HandshakeTable {
    on_open: Some(HandshakeStep::Open),
    transitions: &[
        Transition {
            on: EventKind::ConnectionStarted,
            from: HandshakeState::AwaitingFirstAck,
            to: HandshakeState::AwaitingSecondAck,
            send: Some(HandshakeStep::StartSession),
            capture_resumption: false,
        },
        Transition {
            on: EventKind::SessionStarted,
            from: HandshakeState::AwaitingSecondAck,
            to: HandshakeState::Ready,
            send: None,
            capture_resumption: true,
        },
    ],
    failures: &[EventKind::ConnectionFailed, EventKind::SessionFailed],
    markers: &[
        EventKind::ConnectionStarted,
        EventKind::ConnectionFailed,
        EventKind::SessionStarted,
        EventKind::SessionFailed,
    ],
};

pub const DEFAULT_MAX_CONTEXT_TURNS: usize = 20;
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

const REASON_KEYS: &[&str] = &["error_message", "error", "message"];

#[derive(Debug, Clone)]
pub struct DoubaoAdapter {
    session_id: String,
    max_context_turns: usize,
}

impl DoubaoAdapter {
    /// `session_id` tags every session-scoped frame of this connection.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            max_context_turns: DEFAULT_MAX_CONTEXT_TURNS,
        }
    }

    /// How many of the most recent dialog turns StartSession replays.
    pub fn with_max_context_turns(mut self, turns: usize) -> Self {
        self.max_context_turns = turns;
        self
    }

    fn json_frame(&self, event: u32, session_scoped: bool, payload: &Value) -> Result<Frame> {
        let payload = serde_json::to_vec(payload)?;
        let session_id = session_scoped.then_some(self.session_id.as_str());
        Ok(Frame::Binary(encode_frame(
            message_type::FULL_CLIENT,
            serialization::JSON,
            event,
            session_id,
            &payload,
        )))
    }

    fn start_session_payload(&self, config: &LiveConfig, resume_token: Option<&str>) -> Value {
        let mut tts = Map::new();
        tts.insert(
            "audio_config".into(),
            json!({
                "channel": 1,
                "format": config.output_audio_format.as_deref().unwrap_or("pcm"),
                "sample_rate": OUTPUT_SAMPLE_RATE,
            }),
        );
        if let Some(voice) = &config.voice {
            tts.insert("speaker".into(), json!(voice));
        }

        let mut dialog = Map::new();
        if let Some(instructions) = &config.instructions {
            dialog.insert("system_role".into(), json!(instructions));
        }
        if let Some(token) = resume_token {
            dialog.insert("dialog_id".into(), json!(token));
        }
        let skip = config.dialog_context.len().saturating_sub(self.max_context_turns);
        let context: Vec<Value> = config.dialog_context[skip..]
            .iter()
            .map(|turn| json!({ "role": turn.role.as_str(), "text": turn.text }))
            .collect();
        if !context.is_empty() {
            dialog.insert("dialog_context".into(), Value::Array(context));
        }

        let mut payload = Map::new();
        payload.insert("tts".into(), Value::Object(tts));
        payload.insert("dialog".into(), Value::Object(dialog));
        for (key, value) in &config.extensions {
            payload.insert(key.clone(), value.clone());
        }
        Value::Object(payload)
    }
}

impl ProtocolAdapter for DoubaoAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Doubao
    }

    fn handshake(&self) -> &'static HandshakeTable {
        &HANDSHAKE
    }

    fn build_handshake_open(&self, _config: &LiveConfig, _tools: &[ToolSchema]) -> Result<Option<Frame>> {
        self.json_frame(event::START_CONNECTION, false, &json!({})).map(Some)
    }

    /// Configuration is carried by StartSession; there is no separate config message.
    fn build_session_config(&self, _config: &LiveConfig, _tools: &[ToolSchema]) -> Result<Option<Frame>> {
        Ok(None)
    }

    fn build_start_session(&self, config: &LiveConfig, resume_token: Option<&str>) -> Result<Option<Frame>> {
        let payload = self.start_session_payload(config, resume_token);
        self.json_frame(event::START_SESSION, true, &payload).map(Some)
    }

    fn encode_application_message(&self, message: &ClientMessage) -> Result<Option<Frame>> {
        match message {
            ClientMessage::Audio(audio) => Ok(Some(Frame::Binary(encode_frame(
                message_type::AUDIO_ONLY_CLIENT,
                serialization::RAW,
                event::TASK_REQUEST,
                Some(self.session_id.as_str()),
                audio,
            )))),
            ClientMessage::Text(text) => self
                .json_frame(event::CHAT_TEXT_QUERY, true, &json!({ "content": text }))
                .map(Some),
            other => {
                debug!(kind = other.kind(), "Doubao has no encoding for message");
                Ok(None)
            }
        }
    }

    fn decode(&self, frame: &Frame) -> Result<LiveEvent> {
        let Frame::Binary(bytes) = frame else {
            return Err(AdapterError::decode("expected a binary frame"));
        };
        let raw = RawFrame::new(bytes);
        let Some(event_id) = raw.event_id() else {
            return Err(AdapterError::decode(format!(
                "frame of {} bytes is shorter than the header",
                bytes.len()
            )));
        };
        let text = raw.payload_text();

        if raw.message_type() == Some(message_type::ERROR) {
            // Error frames put an error code where the event id would be.
            let message = first_string_field(&text, REASON_KEYS)
                .unwrap_or("Unknown server error")
                .to_string();
            return Ok(LiveEvent::new(EventPayload::Error {
                code: Some(event_id.to_string()),
                message,
            })
            .with_event_type("Error")
            .with_raw(json_body(&raw)));
        }

        let reason = |fallback: &str| {
            first_string_field(&text, REASON_KEYS)
                .unwrap_or(fallback)
                .to_string()
        };
        let payload = match event_id {
            event::CONNECTION_STARTED => EventPayload::ConnectionStarted,
            event::CONNECTION_FAILED => EventPayload::ConnectionFailed {
                reason: reason("connection failed"),
            },
            event::CONNECTION_FINISHED => EventPayload::Closed {
                reason: "connection finished".to_string(),
            },
            event::SESSION_STARTED => EventPayload::SessionStarted {
                dialog_id: string_field(&text, "dialog_id").map(str::to_string),
            },
            event::SESSION_FAILED => EventPayload::SessionFailed {
                reason: reason("session failed"),
            },
            event::SESSION_FINISHED => EventPayload::Closed {
                reason: "session finished".to_string(),
            },
            event::TTS_RESPONSE => EventPayload::Content(ContentDelta::audio(Bytes::copy_from_slice(raw.body()))),
            event::TTS_ENDED => EventPayload::TurnComplete,
            event::ASR_INFO => EventPayload::SpeechStarted,
            event::ASR_RESPONSE => EventPayload::Transcript {
                role: Role::User,
                text: string_field(&text, "text").unwrap_or_default().to_string(),
                is_final: !bool_field(&text, "is_interim").unwrap_or(false),
            },
            event::ASR_ENDED => EventPayload::SpeechStopped,
            event::CHAT_RESPONSE => EventPayload::Content(ContentDelta::text(
                string_field(&text, "content").unwrap_or_default(),
            )),
            event::DIALOG_COMMON_ERROR => EventPayload::Error {
                code: string_field(&text, "status_code").map(str::to_string),
                message: reason("dialog error"),
            },
            _ => EventPayload::Other,
        };

        let keep_raw = !matches!(payload, EventPayload::Content(_) | EventPayload::Transcript { .. });
        let event = LiveEvent::new(payload)
            .with_event_type(event::name(event_id))
            .with_event_id(Some(event_id.to_string()));
        Ok(if keep_raw { event.with_raw(json_body(&raw)) } else { event })
    }

    fn supports_config_update(&self) -> bool {
        false
    }

    fn build_close(&self) -> Vec<Frame> {
        [
            self.json_frame(event::FINISH_SESSION, true, &json!({})),
            self.json_frame(event::FINISH_CONNECTION, false, &json!({})),
        ]
        .into_iter()
        .filter_map(|frame| frame.ok())
        .collect()
    }
}

/// Best-effort JSON view of the payload; `Null` when it is not JSON.
fn json_body(raw: &RawFrame<'_>) -> Value {
    serde_json::from_slice(raw.body()).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::parse_event_id;
    use live_types::DialogTurn;

    fn server_frame(event: u32, payload: &str) -> Frame {
        Frame::Binary(encode_frame(
            message_type::FULL_SERVER,
            serialization::JSON,
            event,
            Some("sess-1"),
            payload.as_bytes(),
        ))
    }

    fn payload_json(frame: &Frame) -> Value {
        let Frame::Binary(bytes) = frame else {
            panic!("expected a binary frame");
        };
        serde_json::from_slice(RawFrame::new(bytes).body()).expect("json payload")
    }

    #[test]
    fn test_open_sends_start_connection() {
        let adapter = DoubaoAdapter::new("sess-1");
        let frame = adapter
            .build_handshake_open(&LiveConfig::default(), &[])
            .expect("encodes")
            .expect("present");
        let Frame::Binary(bytes) = &frame else {
            panic!("expected a binary frame");
        };
        assert_eq!(parse_event_id(bytes), Some(event::START_CONNECTION));
        assert!(adapter.build_session_config(&LiveConfig::default(), &[]).expect("ok").is_none());
        assert!(!adapter.supports_config_update());
    }

    #[test]
    fn test_start_session_carries_dialog() {
        let adapter = DoubaoAdapter::new("sess-1").with_max_context_turns(2);
        let config = LiveConfig::new()
            .with_instructions("Be kind.")
            .with_voice("zh_female_vv")
            .with_dialog_context([
                DialogTurn::user("first"),
                DialogTurn::assistant("second"),
                DialogTurn::user("third"),
            ]);
        let frame = adapter
            .build_start_session(&config, Some("dlg-7"))
            .expect("encodes")
            .expect("present");
        let payload = payload_json(&frame);
        assert_eq!(payload["dialog"]["dialog_id"], "dlg-7");
        assert_eq!(payload["dialog"]["system_role"], "Be kind.");
        assert_eq!(
            payload["dialog"]["dialog_context"],
            json!([
                {"role": "assistant", "text": "second"},
                {"role": "user", "text": "third"}
            ])
        );
        assert_eq!(payload["tts"]["speaker"], "zh_female_vv");
        assert_eq!(payload["tts"]["audio_config"]["sample_rate"], 24000);
    }

    #[test]
    fn test_session_started_yields_dialog_id() {
        let adapter = DoubaoAdapter::new("sess-1");
        let event = adapter
            .decode(&server_frame(event::SESSION_STARTED, r#"{"dialog_id":"abc123"}"#))
            .expect("decodes");
        assert_eq!(event.kind(), EventKind::SessionStarted);
        assert_eq!(event.resumption_handle(), Some("abc123"));
        assert_eq!(event.metadata.event_id.as_deref(), Some("150"));
        assert_eq!(event.metadata.raw, Some(json!({"dialog_id": "abc123"})));
    }

    #[test]
    fn test_failures_carry_reason() {
        let adapter = DoubaoAdapter::new("sess-1");
        let event = adapter
            .decode(&server_frame(event::SESSION_FAILED, r#"{"error":"quota exceeded"}"#))
            .expect("decodes");
        assert_eq!(event.failure_reason().as_deref(), Some("quota exceeded"));
        assert!(HANDSHAKE.is_failure(event.kind()));

        let event = adapter
            .decode(&server_frame(event::CONNECTION_FAILED, "{}"))
            .expect("decodes");
        assert_eq!(event.failure_reason().as_deref(), Some("connection failed"));
    }

    #[test]
    fn test_decode_dialog_events() {
        let adapter = DoubaoAdapter::new("sess-1");
        let audio = Frame::Binary(encode_frame(
            message_type::AUDIO_ONLY_SERVER,
            serialization::RAW,
            event::TTS_RESPONSE,
            Some("sess-1"),
            &[1, 2, 3, 4],
        ));
        assert_eq!(
            adapter.decode(&audio).expect("decodes").payload,
            EventPayload::Content(ContentDelta::audio(Bytes::from_static(&[1, 2, 3, 4])))
        );

        let asr = adapter
            .decode(&server_frame(event::ASR_RESPONSE, r#"{"results":[{"text":"ni hao","is_interim":true}]}"#))
            .expect("decodes");
        assert_eq!(
            asr.payload,
            EventPayload::Transcript {
                role: Role::User,
                text: "ni hao".into(),
                is_final: false
            }
        );

        let chat = adapter
            .decode(&server_frame(event::CHAT_RESPONSE, r#"{"content":"hello"}"#))
            .expect("decodes");
        assert_eq!(chat.payload, EventPayload::Content(ContentDelta::text("hello")));
        assert_eq!(
            adapter.decode(&server_frame(event::TTS_ENDED, "{}")).expect("decodes").kind(),
            EventKind::TurnComplete
        );
        assert_eq!(
            adapter.decode(&server_frame(9999, "{}")).expect("decodes").kind(),
            EventKind::Other
        );
    }

    #[test]
    fn test_decode_rejects_text_and_short_frames() {
        let adapter = DoubaoAdapter::new("sess-1");
        assert!(adapter.decode(&Frame::Text("{}".into())).is_err());
        assert!(
            adapter
                .decode(&Frame::Binary(Bytes::from_static(&[0x11, 0x94, 0x10, 0x00])))
                .is_err()
        );
    }

    #[test]
    fn test_error_frame() {
        let adapter = DoubaoAdapter::new("sess-1");
        let mut bytes = vec![0x11, 0xF0, 0x10, 0x00];
        bytes.extend_from_slice(&45_000_001u32.to_be_bytes());
        bytes.extend_from_slice(br#"{"error":"bad request"}"#);
        let event = adapter.decode(&Frame::Binary(Bytes::from(bytes))).expect("decodes");
        assert_eq!(
            event.payload,
            EventPayload::Error {
                code: Some("45000001".into()),
                message: "bad request".into()
            }
        );
    }

    #[test]
    fn test_encode_and_close() {
        let adapter = DoubaoAdapter::new("sess-1");
        let audio = adapter
            .encode_application_message(&ClientMessage::Audio(Bytes::from_static(&[7, 7])))
            .expect("ok")
            .expect("present");
        let Frame::Binary(bytes) = &audio else {
            panic!("expected a binary frame");
        };
        assert_eq!(parse_event_id(bytes), Some(event::TASK_REQUEST));

        let text = adapter
            .encode_application_message(&ClientMessage::Text("hi".into()))
            .expect("ok")
            .expect("present");
        assert_eq!(payload_json(&text), json!({"content": "hi"}));

        assert!(
            adapter
                .encode_application_message(&ClientMessage::CancelResponse)
                .expect("ok")
                .is_none()
        );

        let close: Vec<Option<u32>> = adapter
            .build_close()
            .iter()
            .map(|frame| match frame {
                Frame::Binary(bytes) => parse_event_id(bytes),
                Frame::Text(_) => None,
            })
            .collect();
        assert_eq!(close, vec![Some(event::FINISH_SESSION), Some(event::FINISH_CONNECTION)]);
    }
}
