//! Protocol adapter for Gemini Live.

use crate::{endpoint::qualified_model, types::*};
use base64::Engine;
use bytes::Bytes;
use live_types::{
    AdapterError, ClientMessage as LiveMessage, ContentDelta, EventKind, EventPayload, Frame,
    HandshakeState, HandshakeStep, HandshakeTable, LiveConfig, LiveEvent, Modality,
    ProtocolAdapter, Result, Role, ToolCall, ToolSchema, Transition, Vendor,
};
use serde_json::{Value, json};
use tracing::debug;

/// Sends `setup` on open and is ready on `setupComplete`.
pub const HANDSHAKE: HandshakeTable = HandshakeTable {
    on_open: Some(HandshakeStep::Open),
    transitions: &[Transition {
        on: EventKind::SessionCreated,
        from: HandshakeState::AwaitingFirstAck,
        to: HandshakeState::Ready,
        send: None,
        capture_resumption: false,
    }],
    failures: &[],
    markers: &[EventKind::SessionCreated],
};

pub const DEFAULT_VOICE: &str = "Puck";
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    model: String,
}

impl GeminiAdapter {
    pub fn new(model: &str) -> Self {
        Self {
            model: qualified_model(model),
        }
    }

    fn setup(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Frame> {
        // Gemini accepts a single response modality; audio wins when both are asked for.
        let modalities = config.modalities_or(&[Modality::Audio]);
        let audio_out = modalities.contains(&Modality::Audio);
        let response_modality = if audio_out {
            ResponseModality::Audio
        } else {
            ResponseModality::Text
        };

        let speech_config = audio_out.then(|| SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: config.voice.clone().unwrap_or_else(|| DEFAULT_VOICE.to_string()),
                },
            },
        });

        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![Tool {
                function_declarations: tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        let setup = BidiGenerateContentSetup {
            model: self.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec![response_modality],
                speech_config,
                temperature: config.temperature,
            },
            system_instruction: config.instructions.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part { text: text.clone() }],
            }),
            tools,
            realtime_input_config: config.turn_detection.as_ref().map(|vad| RealtimeInputConfig {
                automatic_activity_detection: AutomaticActivityDetection {
                    disabled: vad.disabled,
                    prefix_padding_ms: vad.prefix_padding_ms,
                    silence_duration_ms: vad.silence_duration_ms,
                },
            }),
            input_audio_transcription: config.transcribe_input.then_some(Empty {}),
            output_audio_transcription: audio_out.then_some(Empty {}),
            session_resumption: SessionResumption {
                handle: config.resumption_handle.clone(),
            },
        };

        let mut message = serde_json::to_value(ClientMessage::Setup(setup))?;
        if let Some(Value::Object(body)) = message.get_mut("setup") {
            for (key, value) in &config.extensions {
                body.insert(key.clone(), value.clone());
            }
        }
        Ok(Frame::Text(serde_json::to_string(&message)?))
    }
}

impl ProtocolAdapter for GeminiAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    fn handshake(&self) -> &'static HandshakeTable {
        &HANDSHAKE
    }

    fn build_handshake_open(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Option<Frame>> {
        self.setup(config, tools).map(Some)
    }

    fn build_session_config(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Option<Frame>> {
        self.setup(config, tools).map(Some)
    }

    fn encode_application_message(&self, message: &LiveMessage) -> Result<Option<Frame>> {
        let message = match message {
            LiveMessage::Audio(audio) => ClientMessage::RealtimeInput(BidiGenerateContentRealtimeInput {
                audio: Some(Blob {
                    mime_type: INPUT_AUDIO_MIME.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(audio),
                }),
                ..Default::default()
            }),
            LiveMessage::Text(text) => ClientMessage::ClientContent(BidiGenerateContentClientContent {
                turns: vec![Content {
                    role: Some(Role::User.as_str().to_string()),
                    parts: vec![Part { text: text.clone() }],
                }],
                turn_complete: true,
            }),
            LiveMessage::ToolResult { call_id, name, output } => {
                ClientMessage::ToolResponse(BidiGenerateContentToolResponse {
                    function_responses: vec![FunctionResponse {
                        id: call_id.clone(),
                        name: name.clone(),
                        response: tool_response(output),
                    }],
                })
            }
            LiveMessage::ActivityStart => ClientMessage::RealtimeInput(BidiGenerateContentRealtimeInput {
                activity_start: Some(Empty {}),
                ..Default::default()
            }),
            LiveMessage::ActivityEnd => ClientMessage::RealtimeInput(BidiGenerateContentRealtimeInput {
                activity_end: Some(Empty {}),
                ..Default::default()
            }),
            LiveMessage::AudioStreamEnd => ClientMessage::RealtimeInput(BidiGenerateContentRealtimeInput {
                audio_stream_end: Some(true),
                ..Default::default()
            }),
            other => {
                debug!(kind = other.kind(), "Gemini has no encoding for message");
                return Ok(None);
            }
        };
        Ok(Some(Frame::Text(serde_json::to_string(&message)?)))
    }

    /// Gemini sends JSON in both text and binary frames.
    /// The first event of the frame. The session engine reads `decode_all`.
    fn decode(&self, frame: &Frame) -> Result<LiveEvent> {
        self.decode_all(frame)?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::decode("frame carried no events"))
    }

    /// A `serverContent` frame may carry model output, transcriptions and an
    /// interruption at once; each becomes its own event, in that order.
    fn decode_all(&self, frame: &Frame) -> Result<Vec<LiveEvent>> {
        let text = frame
            .as_text()
            .ok_or_else(|| AdapterError::decode("binary frame is not UTF-8 JSON"))?;
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AdapterError::decode(format!("invalid JSON: {e}")))?;
        let Some(first_key) = value.as_object().map(|o| o.keys().next().cloned()) else {
            return Err(AdapterError::decode("server message is not a JSON object"));
        };
        let message: ServerMessage = serde_json::from_value(value.clone())
            .map_err(|e| AdapterError::decode(format!("unexpected server message shape: {e}")))?;

        let (event_type, payloads) = classify(message)?;
        let event_type = event_type
            .map(str::to_string)
            .or(first_key)
            .unwrap_or_else(|| "unknown".to_string());

        Ok(payloads
            .into_iter()
            .map(|payload| {
                let keep_raw = !matches!(payload, EventPayload::Content(_) | EventPayload::Transcript { .. });
                let event = LiveEvent::new(payload).with_event_type(event_type.clone());
                if keep_raw { event.with_raw(value.clone()) } else { event }
            })
            .collect())
    }

    /// Session settings are fixed by `setup`.
    fn supports_config_update(&self) -> bool {
        false
    }
}

/// Tool output is passed through as an object when it already is one.
fn tool_response(output: &str) -> Value {
    match serde_json::from_str::<Value>(output) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "output": output }),
    }
}

fn classify(message: ServerMessage) -> Result<(Option<&'static str>, Vec<EventPayload>)> {
    if message.setup_complete.is_some() {
        return Ok((Some("setupComplete"), vec![EventPayload::SessionCreated { session_id: None }]));
    }
    if let Some(tool_call) = message.tool_call {
        let calls = tool_call
            .function_calls
            .into_iter()
            .map(|call| ToolCall {
                call_id: call.id.unwrap_or_default(),
                name: call.name,
                arguments: call.args.map(|a| a.to_string()).unwrap_or_else(|| "{}".to_string()),
            })
            .collect();
        return Ok((Some("toolCall"), vec![EventPayload::ToolCall { calls }]));
    }
    if let Some(content) = message.server_content {
        return Ok((Some("serverContent"), server_content(content)?));
    }
    if let Some(update) = message.session_resumption_update {
        let payload = match update.new_handle {
            Some(handle) if !handle.is_empty() && update.resumable != Some(false) => {
                EventPayload::ResumptionUpdate { handle }
            }
            _ => EventPayload::Other,
        };
        return Ok((Some("sessionResumptionUpdate"), vec![payload]));
    }
    if let Some(go_away) = message.go_away {
        return Ok((Some("goAway"), vec![EventPayload::GoAway { time_left: go_away.time_left }]));
    }
    if let Some(error) = message.error {
        let code = error.code.map(|code| match code {
            Value::String(code) => code,
            other => other.to_string(),
        });
        let message = error.message.unwrap_or_else(|| "Unknown server error".to_string());
        return Ok((Some("error"), vec![EventPayload::Error { code, message }]));
    }
    Ok((None, vec![EventPayload::Other]))
}

fn server_content(content: LiveServerContent) -> Result<Vec<EventPayload>> {
    let end_of_turn = content.turn_complete.unwrap_or(false);
    let mut payloads = Vec::new();

    if let Some(turn) = content.model_turn {
        let mut text = String::new();
        let mut audio = Vec::new();
        for part in turn.parts {
            if let Some(chunk) = part.text {
                text.push_str(&chunk);
            }
            if let Some(blob) = part.inline_data {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(blob.data)
                    .map_err(|e| AdapterError::decode(format!("invalid inline audio: {e}")))?;
                audio.extend_from_slice(&decoded);
            }
        }
        if !text.is_empty() || !audio.is_empty() {
            payloads.push(EventPayload::Content(ContentDelta {
                text: (!text.is_empty()).then_some(text),
                audio: (!audio.is_empty()).then(|| Bytes::from(audio)),
                end_of_turn,
            }));
        }
    }
    // Turn completion rides on the content delta when there is one.
    let turn_reported = !payloads.is_empty();

    if let Some(transcription) = content.output_transcription {
        payloads.push(EventPayload::Transcript {
            role: Role::Assistant,
            text: transcription.text,
            is_final: transcription.finished.unwrap_or(false),
        });
    }
    if let Some(transcription) = content.input_transcription {
        payloads.push(EventPayload::Transcript {
            role: Role::User,
            text: transcription.text,
            is_final: transcription.finished.unwrap_or(false),
        });
    }
    if content.interrupted == Some(true) {
        payloads.push(EventPayload::Interrupted);
    }
    if end_of_turn && !turn_reported {
        payloads.push(EventPayload::TurnComplete);
    }
    if payloads.is_empty() {
        payloads.push(EventPayload::Other);
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_types::TurnDetection;

    fn adapter() -> GeminiAdapter {
        GeminiAdapter::new("gemini-2.0-flash-live-001")
    }

    fn json_of(frame: Frame) -> Value {
        serde_json::from_str(frame.as_text().expect("text frame")).expect("valid json")
    }

    #[test]
    fn test_setup_is_sent_on_open() {
        let config = LiveConfig::new()
            .with_instructions("You are a tutor.")
            .with_voice("Kore")
            .with_input_transcription(true)
            .with_resumption_handle("resume-1")
            .with_turn_detection(TurnDetection {
                silence_duration_ms: Some(500),
                ..Default::default()
            });
        let tools = [ToolSchema::new("lookup", "Look up", json!({"type": "object"}))];

        assert_eq!(adapter().handshake().on_open, Some(HandshakeStep::Open));
        let setup = json_of(
            adapter()
                .build_handshake_open(&config, &tools)
                .expect("encodes")
                .expect("present"),
        );
        let setup = &setup["setup"];
        assert_eq!(setup["model"], "models/gemini-2.0-flash-live-001");
        assert_eq!(setup["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(setup["systemInstruction"]["parts"][0]["text"], "You are a tutor.");
        assert_eq!(setup["tools"][0]["functionDeclarations"][0]["name"], "lookup");
        assert_eq!(
            setup["realtimeInputConfig"]["automaticActivityDetection"]["silenceDurationMs"],
            500
        );
        assert_eq!(setup["inputAudioTranscription"], json!({}));
        assert_eq!(setup["sessionResumption"]["handle"], "resume-1");
    }

    #[test]
    fn test_text_only_setup_and_extensions() {
        let config = LiveConfig::new()
            .with_modalities([Modality::Text])
            .with_extension("contextWindowCompression", json!({"slidingWindow": {}}));
        let setup = json_of(
            adapter()
                .build_session_config(&config, &[])
                .expect("encodes")
                .expect("present"),
        );
        assert_eq!(setup["setup"]["generationConfig"]["responseModalities"], json!(["TEXT"]));
        assert!(setup["setup"]["generationConfig"].get("speechConfig").is_none());
        assert!(setup["setup"].get("outputAudioTranscription").is_none());
        assert_eq!(setup["setup"]["sessionResumption"], json!({}));
        assert_eq!(setup["setup"]["contextWindowCompression"], json!({"slidingWindow": {}}));
    }

    #[test]
    fn test_setup_complete_is_marker() {
        let event = adapter()
            .decode(&Frame::Binary(Bytes::from_static(br#"{"setupComplete":{}}"#)))
            .expect("decodes");
        assert_eq!(event.kind(), EventKind::SessionCreated);
        assert!(HANDSHAKE.is_marker(event.kind()));
        assert_eq!(event.metadata.event_type.as_deref(), Some("setupComplete"));
    }

    #[test]
    fn test_decode_model_turn_folds_parts() {
        let frame = Frame::Text(
            json!({
                "serverContent": {
                    "modelTurn": { "parts": [
                        { "text": "Hel" },
                        { "text": "lo" },
                        { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AQID" } }
                    ]},
                    "turnComplete": true
                }
            })
            .to_string(),
        );
        let event = adapter().decode(&frame).expect("decodes");
        assert_eq!(
            event.payload,
            EventPayload::Content(ContentDelta {
                text: Some("Hello".into()),
                audio: Some(Bytes::from_static(&[1, 2, 3])),
                end_of_turn: true,
            })
        );
        assert!(event.metadata.raw.is_none());
    }

    #[test]
    fn test_decode_server_content_signals() {
        let decode = |value: Value| adapter().decode(&Frame::Text(value.to_string())).expect("decodes");

        let event = decode(json!({"serverContent": {"outputTranscription": {"text": "hi"}}}));
        assert_eq!(
            event.payload,
            EventPayload::Transcript {
                role: Role::Assistant,
                text: "hi".into(),
                is_final: false
            }
        );
        let event = decode(json!({"serverContent": {"inputTranscription": {"text": "hey", "finished": true}}}));
        assert_eq!(
            event.payload,
            EventPayload::Transcript {
                role: Role::User,
                text: "hey".into(),
                is_final: true
            }
        );
        assert_eq!(decode(json!({"serverContent": {"interrupted": true}})).kind(), EventKind::Interrupted);
        assert_eq!(decode(json!({"serverContent": {"turnComplete": true}})).kind(), EventKind::TurnComplete);
        assert_eq!(decode(json!({"usageMetadata": {"totalTokenCount": 3}})).kind(), EventKind::Other);
    }

    #[test]
    fn test_decode_all_keeps_bundled_updates() {
        let frame = Frame::Text(
            json!({
                "serverContent": {
                    "modelTurn": { "parts": [{ "text": "Sure" }] },
                    "outputTranscription": { "text": "Sure", "finished": true },
                    "inputTranscription": { "text": "can you" },
                    "interrupted": true,
                    "turnComplete": true
                }
            })
            .to_string(),
        );
        let events = adapter().decode_all(&frame).expect("decodes");
        let kinds: Vec<EventKind> = events.iter().map(LiveEvent::kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::Content,
                EventKind::Transcript,
                EventKind::Transcript,
                EventKind::Interrupted
            ]
        );
        assert!(matches!(
            &events[0].payload,
            EventPayload::Content(ContentDelta { end_of_turn: true, .. })
        ));
        assert!(events.iter().all(|event| event.metadata.event_type.as_deref() == Some("serverContent")));

        let single = adapter()
            .decode_all(&Frame::Text(json!({"serverContent": {"turnComplete": true}}).to_string()))
            .expect("decodes");
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].kind(), EventKind::TurnComplete);
    }

    #[test]
    fn test_decode_tool_call_and_resumption() {
        let event = adapter()
            .decode(&Frame::Text(
                json!({"toolCall": {"functionCalls": [
                    {"id": "fc-1", "name": "lookup", "args": {"q": "rust"}},
                    {"id": "fc-2", "name": "clock"}
                ]}})
                .to_string(),
            ))
            .expect("decodes");
        let EventPayload::ToolCall { calls } = event.payload else {
            panic!("expected a tool call");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments, r#"{"q":"rust"}"#);
        assert_eq!(calls[1].arguments, "{}");

        let event = adapter()
            .decode(&Frame::Text(
                json!({"sessionResumptionUpdate": {"newHandle": "h-9", "resumable": true}}).to_string(),
            ))
            .expect("decodes");
        assert_eq!(event.resumption_handle(), Some("h-9"));

        let event = adapter()
            .decode(&Frame::Text(
                json!({"sessionResumptionUpdate": {"resumable": false}}).to_string(),
            ))
            .expect("decodes");
        assert_eq!(event.kind(), EventKind::Other);
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(adapter().decode(&Frame::Text("not json".into())).is_err());
        assert!(adapter().decode(&Frame::Text("[1,2]".into())).is_err());
        assert!(
            adapter()
                .decode(&Frame::Binary(Bytes::from_static(&[0xff, 0x00, 0x01])))
                .is_err()
        );
    }

    #[test]
    fn test_encode_messages() {
        let audio = json_of(
            adapter()
                .encode_application_message(&LiveMessage::Audio(Bytes::from_static(&[1, 2, 3])))
                .expect("ok")
                .expect("present"),
        );
        assert_eq!(audio["realtimeInput"]["audio"]["mimeType"], INPUT_AUDIO_MIME);
        assert_eq!(audio["realtimeInput"]["audio"]["data"], "AQID");

        let text = json_of(
            adapter()
                .encode_application_message(&LiveMessage::Text("hi".into()))
                .expect("ok")
                .expect("present"),
        );
        assert_eq!(text["clientContent"]["turns"][0]["role"], "user");
        assert_eq!(text["clientContent"]["turnComplete"], true);

        let result = json_of(
            adapter()
                .encode_application_message(&LiveMessage::ToolResult {
                    call_id: "fc-1".into(),
                    name: "lookup".into(),
                    output: "42".into(),
                })
                .expect("ok")
                .expect("present"),
        );
        assert_eq!(result["toolResponse"]["functionResponses"][0]["response"], json!({"output": "42"}));

        let end = json_of(
            adapter()
                .encode_application_message(&LiveMessage::AudioStreamEnd)
                .expect("ok")
                .expect("present"),
        );
        assert_eq!(end, json!({"realtimeInput": {"audioStreamEnd": true}}));

        assert!(
            adapter()
                .encode_application_message(&LiveMessage::CommitAudio)
                .expect("ok")
                .is_none()
        );
        assert!(!adapter().supports_config_update());
    }
}
