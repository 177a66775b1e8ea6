//! JSON event codec for OpenAI-style realtime protocols.
//!
//! OpenAI Realtime and the vendors that mirror its event vocabulary (Qwen-Omni
//! realtime) share this codec; a [`CodecProfile`] captures where they differ.

use base64::Engine;
use live_types::{
    AdapterError, ClientMessage, ContentDelta, EventPayload, Frame, LiveConfig, LiveEvent,
    Modality, Result, Role, ToolCall, ToolSchema, TurnDetection, Vendor,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

/// The vendor-specific knobs of an OpenAI-style protocol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecProfile {
    pub vendor: Vendor,
    pub default_voice: &'static str,
    pub default_modalities: &'static [Modality],
    pub input_audio_format: &'static str,
    pub output_audio_format: &'static str,
    /// Model used when the caller asks for input transcription.
    pub transcription_model: &'static str,
    pub supports_tools: bool,
    pub supports_cancel: bool,
}

// --- Outbound wire types ---

#[derive(Serialize)]
struct SessionResource {
    modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    voice: String,
    input_audio_format: String,
    output_audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_audio_transcription: Option<AudioTranscription>,
    /// `Some(None)` serializes as `null`, which turns server VAD off.
    #[serde(skip_serializing_if = "Option::is_none")]
    turn_detection: Option<Option<ServerVad>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AudioTranscription {
    model: &'static str,
}

#[derive(Serialize)]
struct ServerVad {
    r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    silence_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    create_response: Option<bool>,
}

#[derive(Serialize)]
struct FunctionTool {
    r#type: &'static str,
    name: String,
    description: String,
    parameters: Value,
}

fn server_vad(vad: &TurnDetection) -> Option<ServerVad> {
    if vad.disabled {
        return None;
    }
    Some(ServerVad {
        r#type: "server_vad",
        threshold: vad.threshold,
        prefix_padding_ms: vad.prefix_padding_ms,
        silence_duration_ms: vad.silence_duration_ms,
        create_response: vad.create_response,
    })
}

/// Encodes and decodes OpenAI-style realtime events.
#[derive(Debug, Clone)]
pub struct RealtimeCodec {
    profile: CodecProfile,
}

impl RealtimeCodec {
    pub fn new(profile: CodecProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CodecProfile {
        &self.profile
    }

    /// Builds a `session.update` event from the generic session configuration.
    pub fn session_update(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Frame> {
        let tools: Vec<FunctionTool> = if self.profile.supports_tools {
            tools
                .iter()
                .map(|tool| FunctionTool {
                    r#type: "function",
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                })
                .collect()
        } else {
            if !tools.is_empty() {
                debug!(vendor = %self.profile.vendor, count = tools.len(), "Vendor does not support tools; omitting them");
            }
            Vec::new()
        };

        let resource = SessionResource {
            modalities: config
                .modalities_or(self.profile.default_modalities)
                .iter()
                .map(Modality::as_str)
                .collect(),
            instructions: config.instructions.clone(),
            voice: config
                .voice
                .clone()
                .unwrap_or_else(|| self.profile.default_voice.to_string()),
            input_audio_format: config
                .input_audio_format
                .clone()
                .unwrap_or_else(|| self.profile.input_audio_format.to_string()),
            output_audio_format: config
                .output_audio_format
                .clone()
                .unwrap_or_else(|| self.profile.output_audio_format.to_string()),
            input_audio_transcription: config.transcribe_input.then_some(AudioTranscription {
                model: self.profile.transcription_model,
            }),
            turn_detection: config.turn_detection.as_ref().map(server_vad),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            temperature: config.temperature,
        };

        let mut session = serde_json::to_value(resource)?;
        if let Value::Object(fields) = &mut session {
            for (key, value) in &config.extensions {
                fields.insert(key.clone(), value.clone());
            }
        }
        let event = json!({ "type": "session.update", "session": session });
        Ok(Frame::Text(serde_json::to_string(&event)?))
    }

    /// Encodes an application message, or `None` for kinds this profile does not support.
    pub fn encode(&self, message: &ClientMessage) -> Result<Option<Frame>> {
        let event = match message {
            ClientMessage::Audio(data) => json!({
                "type": "input_audio_buffer.append",
                "audio": base64::engine::general_purpose::STANDARD.encode(data),
            }),
            ClientMessage::Text(text) => json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "message",
                    "role": "user",
                    "content": [{ "type": "input_text", "text": text }],
                },
            }),
            ClientMessage::ToolResult { call_id, output, .. } if self.profile.supports_tools => json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "function_call_output",
                    "call_id": call_id,
                    "output": output,
                },
            }),
            ClientMessage::CommitAudio => json!({ "type": "input_audio_buffer.commit" }),
            ClientMessage::ClearAudio => json!({ "type": "input_audio_buffer.clear" }),
            ClientMessage::CreateResponse => json!({ "type": "response.create" }),
            ClientMessage::CancelResponse if self.profile.supports_cancel => {
                json!({ "type": "response.cancel" })
            }
            _ => return Ok(None),
        };
        Ok(Some(Frame::Text(serde_json::to_string(&event)?)))
    }

    /// Decodes one server event.
    pub fn decode(&self, frame: &Frame) -> Result<LiveEvent> {
        let text = frame
            .as_text()
            .ok_or_else(|| AdapterError::decode("binary frame is not UTF-8 JSON"))?;
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AdapterError::decode(format!("invalid JSON: {e}")))?;
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::decode("server event has no `type`"))?
            .to_string();
        let event_id = str_at(&value, "/event_id");

        let payload = match event_type.as_str() {
            "session.created" => EventPayload::SessionCreated {
                session_id: str_at(&value, "/session/id"),
            },
            "session.updated" => EventPayload::SessionUpdated,
            "response.audio.delta" | "response.output_audio.delta" => {
                let delta = required_str(&value, "/delta", &event_type)?;
                let audio = base64::engine::general_purpose::STANDARD
                    .decode(delta)
                    .map_err(|e| AdapterError::decode(format!("invalid audio delta: {e}")))?;
                EventPayload::Content(ContentDelta::audio(audio))
            }
            "response.text.delta" | "response.output_text.delta" => EventPayload::Content(
                ContentDelta::text(required_str(&value, "/delta", &event_type)?),
            ),
            "response.audio_transcript.delta" | "response.output_audio_transcript.delta" => {
                EventPayload::Transcript {
                    role: Role::Assistant,
                    text: required_str(&value, "/delta", &event_type)?.to_string(),
                    is_final: false,
                }
            }
            "response.audio_transcript.done" | "response.output_audio_transcript.done" => {
                EventPayload::Transcript {
                    role: Role::Assistant,
                    text: str_at(&value, "/transcript").unwrap_or_default(),
                    is_final: true,
                }
            }
            "conversation.item.input_audio_transcription.delta" => EventPayload::Transcript {
                role: Role::User,
                text: required_str(&value, "/delta", &event_type)?.to_string(),
                is_final: false,
            },
            "conversation.item.input_audio_transcription.completed" => EventPayload::Transcript {
                role: Role::User,
                text: str_at(&value, "/transcript").unwrap_or_default(),
                is_final: true,
            },
            "response.function_call_arguments.done" => EventPayload::ToolCall {
                calls: vec![ToolCall {
                    call_id: required_str(&value, "/call_id", &event_type)?.to_string(),
                    name: str_at(&value, "/name").unwrap_or_default(),
                    arguments: str_at(&value, "/arguments").unwrap_or_else(|| "{}".to_string()),
                }],
            },
            "input_audio_buffer.speech_started" => EventPayload::SpeechStarted,
            "input_audio_buffer.speech_stopped" => EventPayload::SpeechStopped,
            "response.done" => EventPayload::TurnComplete,
            "error" => EventPayload::Error {
                code: str_at(&value, "/error/code"),
                message: str_at(&value, "/error/message")
                    .unwrap_or_else(|| "Unknown server error".to_string()),
            },
            _ => EventPayload::Other,
        };

        let keep_raw = !matches!(payload, EventPayload::Content(_) | EventPayload::Transcript { .. });
        let event = LiveEvent::new(payload)
            .with_event_type(event_type)
            .with_event_id(event_id);
        Ok(if keep_raw { event.with_raw(value) } else { event })
    }
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn required_str<'a>(value: &'a Value, pointer: &str, event_type: &str) -> Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::decode(format!("`{event_type}` is missing `{pointer}`")))
}
