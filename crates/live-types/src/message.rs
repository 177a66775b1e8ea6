use bytes::Bytes;

/// An application message a caller sends on a ready session.
///
/// Not every vendor understands every kind; adapters return no encoding for
/// the kinds they do not support and the session drops them silently.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// A chunk of raw input audio in the vendor's expected format.
    Audio(Bytes),
    /// A user text turn.
    Text(String),
    /// The result of a function the model called.
    ToolResult {
        call_id: String,
        name: String,
        output: String,
    },
    /// Commit buffered input audio as a user turn (manual turn detection).
    CommitAudio,
    /// Discard buffered input audio.
    ClearAudio,
    /// Ask the model to respond now.
    CreateResponse,
    /// Cancel the response in progress.
    CancelResponse,
    /// Manual voice activity: the user started speaking.
    ActivityStart,
    /// Manual voice activity: the user stopped speaking.
    ActivityEnd,
    /// The input audio stream has ended (e.g. the microphone was closed).
    AudioStreamEnd,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Audio(_) => "audio",
            ClientMessage::Text(_) => "text",
            ClientMessage::ToolResult { .. } => "tool_result",
            ClientMessage::CommitAudio => "commit_audio",
            ClientMessage::ClearAudio => "clear_audio",
            ClientMessage::CreateResponse => "create_response",
            ClientMessage::CancelResponse => "cancel_response",
            ClientMessage::ActivityStart => "activity_start",
            ClientMessage::ActivityEnd => "activity_end",
            ClientMessage::AudioStreamEnd => "audio_stream_end",
        }
    }
}
