//! Protocol adapter for the OpenAI Realtime API.

use crate::codec::{CodecProfile, RealtimeCodec};
use live_types::{
    ClientMessage, EventKind, Frame, HandshakeState, HandshakeStep, HandshakeTable, LiveConfig,
    LiveEvent, Modality, ProtocolAdapter, Result, ToolSchema, Transition, Vendor,
};

/// Waits for `session.created`, sends `session.update`, and is ready on `session.updated`.
pub const HANDSHAKE: HandshakeTable = HandshakeTable {
    on_open: None,
    transitions: &[
        Transition {
            on: EventKind::SessionCreated,
            from: HandshakeState::AwaitingFirstAck,
            to: HandshakeState::AwaitingSecondAck,
            send: Some(HandshakeStep::SessionConfig),
            capture_resumption: false,
        },
        Transition {
            on: EventKind::SessionUpdated,
            from: HandshakeState::AwaitingSecondAck,
            to: HandshakeState::Ready,
            send: None,
            capture_resumption: false,
        },
    ],
    failures: &[],
    markers: &[EventKind::SessionCreated, EventKind::SessionUpdated],
};

pub const PROFILE: CodecProfile = CodecProfile {
    vendor: Vendor::OpenAI,
    default_voice: "alloy",
    default_modalities: &[Modality::Text, Modality::Audio],
    input_audio_format: "pcm16",
    output_audio_format: "pcm16",
    transcription_model: "whisper-1",
    supports_tools: true,
    supports_cancel: true,
};

#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    codec: RealtimeCodec,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self {
            codec: RealtimeCodec::new(PROFILE),
        }
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolAdapter for OpenAiAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAI
    }

    fn handshake(&self) -> &'static HandshakeTable {
        &HANDSHAKE
    }

    fn build_handshake_open(&self, _config: &LiveConfig, _tools: &[ToolSchema]) -> Result<Option<Frame>> {
        Ok(None)
    }

    fn build_session_config(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Option<Frame>> {
        self.codec.session_update(config, tools).map(Some)
    }

    fn encode_application_message(&self, message: &ClientMessage) -> Result<Option<Frame>> {
        self.codec.encode(message)
    }

    fn decode(&self, frame: &Frame) -> Result<LiveEvent> {
        self.codec.decode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waits_for_server_before_sending() {
        let adapter = OpenAiAdapter::new();
        assert!(adapter.handshake().on_open.is_none());
        assert!(
            adapter
                .build_handshake_open(&LiveConfig::default(), &[])
                .expect("no error")
                .is_none()
        );
        assert!(adapter.supports_config_update());
        assert!(adapter.build_close().is_empty());
    }

    #[test]
    fn test_session_config_is_session_update() {
        let adapter = OpenAiAdapter::new();
        let frame = adapter
            .build_session_config(&LiveConfig::new().with_voice("verse"), &[])
            .expect("encodes")
            .expect("present");
        let text = frame.as_text().expect("text frame");
        assert!(text.contains(r#""type":"session.update""#));
        assert!(text.contains(r#""voice":"verse""#));
    }
}
