use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Generic configuration for a live session with any vendor.
///
/// Fields left as `None` (or empty) fall back to the vendor's defaults. The
/// `extensions` map is merged verbatim into the vendor's configuration payload,
/// so vendor-specific knobs can be passed without widening this struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    pub voice: Option<String>,
    pub instructions: Option<String>,
    #[serde(default)]
    pub modalities: Vec<Modality>,
    pub input_audio_format: Option<String>,
    pub output_audio_format: Option<String>,
    pub turn_detection: Option<TurnDetection>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub transcribe_input: bool,
    /// Prior turns replayed to vendors that accept dialog context on start.
    #[serde(default)]
    pub dialog_context: Vec<DialogTurn>,
    /// A resumption handle issued by an earlier session with the same vendor.
    pub resumption_handle: Option<String>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl LiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_modalities(mut self, modalities: impl IntoIterator<Item = Modality>) -> Self {
        self.modalities = modalities.into_iter().collect();
        self
    }

    pub fn with_turn_detection(mut self, turn_detection: TurnDetection) -> Self {
        self.turn_detection = Some(turn_detection);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_input_transcription(mut self, enabled: bool) -> Self {
        self.transcribe_input = enabled;
        self
    }

    pub fn with_dialog_context(mut self, turns: impl IntoIterator<Item = DialogTurn>) -> Self {
        self.dialog_context = turns.into_iter().collect();
        self
    }

    pub fn with_resumption_handle(mut self, handle: impl Into<String>) -> Self {
        self.resumption_handle = Some(handle.into());
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Requested modalities, or `default` when the caller left them unset.
    pub fn modalities_or(&self, default: &[Modality]) -> Vec<Modality> {
        if self.modalities.is_empty() {
            default.to_vec()
        } else {
            self.modalities.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Audio => "audio",
        }
    }
}

/// Voice-activity detection settings, passed through to the vendor untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    /// Disables server-side detection; the caller then marks turns explicitly.
    #[serde(default)]
    pub disabled: bool,
    pub threshold: Option<f32>,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
    pub create_response: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One prior exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub role: Role,
    pub text: String,
}

impl DialogTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A function the model may call during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the function's arguments.
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modalities_fallback() {
        let config = LiveConfig::new();
        assert_eq!(config.modalities_or(&[Modality::Audio]), vec![Modality::Audio]);

        let config = config.with_modalities([Modality::Text]);
        assert_eq!(config.modalities_or(&[Modality::Audio]), vec![Modality::Text]);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LiveConfig = serde_json::from_value(json!({
            "voice": "alloy",
            "instructions": "Be brief.",
            "turn_detection": { "silence_duration_ms": 700 }
        }))
        .expect("config should deserialize");

        assert_eq!(config.voice.as_deref(), Some("alloy"));
        assert!(config.modalities.is_empty());
        assert!(config.extensions.is_empty());
        let vad = config.turn_detection.expect("vad present");
        assert!(!vad.disabled);
        assert_eq!(vad.silence_duration_ms, Some(700));
    }
}
