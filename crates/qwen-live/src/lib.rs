//! Qwen-Omni realtime adapter (DashScope).
//!
//! The wire vocabulary mirrors OpenAI Realtime, so this crate reuses the
//! OpenAI-style codec with its own profile: different default voice and
//! output format, no function calling.

use live_types::{
    ClientMessage, Frame, HandshakeTable, LiveConfig, LiveEvent, Modality, ProtocolAdapter,
    Result, ToolSchema, Vendor, WireRequest,
};
use openai_live::{CodecProfile, RealtimeCodec};

pub const DEFAULT_BASE_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/realtime";
pub const DEFAULT_MODEL: &str = "qwen-omni-turbo-realtime";

pub const PROFILE: CodecProfile = CodecProfile {
    vendor: Vendor::Qwen,
    default_voice: "Chelsie",
    default_modalities: &[Modality::Text, Modality::Audio],
    input_audio_format: "pcm16",
    output_audio_format: "pcm24",
    transcription_model: "gummy-realtime-v1",
    supports_tools: false,
    supports_cancel: true,
};

/// Builds the connection request: bearer auth plus DashScope's own headers.
pub fn endpoint(base_url: Option<&str>, model: &str, api_key: &str) -> WireRequest {
    let base = base_url.unwrap_or(DEFAULT_BASE_URL);
    WireRequest::new(format!("{base}?model={model}"))
        .with_header("Authorization", format!("Bearer {api_key}"))
        .with_header("X-DashScope-DataInspection", "enable")
}

#[derive(Debug, Clone)]
pub struct QwenAdapter {
    codec: RealtimeCodec,
}

impl QwenAdapter {
    pub fn new() -> Self {
        Self {
            codec: RealtimeCodec::new(PROFILE),
        }
    }
}

impl Default for QwenAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolAdapter for QwenAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Qwen
    }

    fn handshake(&self) -> &'static HandshakeTable {
        // Same created -> update -> updated exchange as OpenAI.
        &openai_live::adapter::HANDSHAKE
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
    use bytes::Bytes;
    use live_types::{EventKind, ToolSchema};
    use serde_json::{Value, json};

    #[test]
    fn test_endpoint_uses_dashscope_headers() {
        let request = endpoint(None, DEFAULT_MODEL, "sk-dash");
        assert_eq!(
            request.url,
            "wss://dashscope.aliyuncs.com/api-ws/v1/realtime?model=qwen-omni-turbo-realtime"
        );
        assert_eq!(request.header("authorization"), Some("Bearer sk-dash"));
        assert_eq!(request.header("X-DashScope-DataInspection"), Some("enable"));
    }

    #[test]
    fn test_session_config_drops_tools() {
        let adapter = QwenAdapter::new();
        let tools = [ToolSchema::new("lookup", "Look up", json!({"type": "object"}))];
        let frame = adapter
            .build_session_config(&LiveConfig::default(), &tools)
            .expect("encodes")
            .expect("present");
        let event: Value = serde_json::from_str(frame.as_text().expect("text")).expect("json");
        assert_eq!(event["session"]["voice"], "Chelsie");
        assert_eq!(event["session"]["output_audio_format"], "pcm24");
        assert!(event["session"].get("tools").is_none());
    }

    #[test]
    fn test_tool_results_are_discarded() {
        let adapter = QwenAdapter::new();
        let message = ClientMessage::ToolResult {
            call_id: "c1".into(),
            name: "lookup".into(),
            output: "42".into(),
        };
        assert!(adapter.encode_application_message(&message).expect("ok").is_none());
        assert!(
            adapter
                .encode_application_message(&ClientMessage::Audio(Bytes::from_static(b"\x01\x02")))
                .expect("ok")
                .is_some()
        );
    }

    #[test]
    fn test_handshake_markers_match_openai() {
        let adapter = QwenAdapter::new();
        assert!(adapter.handshake().is_marker(EventKind::SessionCreated));
        assert!(adapter.handshake().is_marker(EventKind::SessionUpdated));
    }
}
