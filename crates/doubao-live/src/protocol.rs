//! Constants and the frame builder for the binary dialogue protocol.
//!
//! Every frame starts with a 4-byte header followed by the big-endian event id:
//!
//! ```text
//! byte 0   protocol version (high nibble) | header size in words (low nibble)
//! byte 1   message type (high nibble)     | flags (low nibble)
//! byte 2   serialization (high nibble)    | compression (low nibble)
//! byte 3   reserved
//! 4..8     event id (u32, big endian)
//! ```
//!
//! Session-scoped frames then carry a length-prefixed session id, and every
//! frame ends with a length-prefixed payload.

use bytes::{BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 8;
pub const VERSION_AND_HEADER_SIZE: u8 = 0x11;
/// The frame carries an event id.
pub const FLAG_WITH_EVENT: u8 = 0b0100;

pub mod message_type {
    pub const FULL_CLIENT: u8 = 0b0001;
    pub const AUDIO_ONLY_CLIENT: u8 = 0b0010;
    pub const FULL_SERVER: u8 = 0b1001;
    pub const AUDIO_ONLY_SERVER: u8 = 0b1011;
    pub const ERROR: u8 = 0b1111;
}

pub mod serialization {
    pub const RAW: u8 = 0b0000;
    pub const JSON: u8 = 0b0001;
}

pub mod event {
    // Client, connection scope.
    pub const START_CONNECTION: u32 = 1;
    pub const FINISH_CONNECTION: u32 = 2;
    // Server, connection scope.
    pub const CONNECTION_STARTED: u32 = 50;
    pub const CONNECTION_FAILED: u32 = 51;
    pub const CONNECTION_FINISHED: u32 = 52;
    // Client, session scope.
    pub const START_SESSION: u32 = 100;
    pub const FINISH_SESSION: u32 = 102;
    pub const TASK_REQUEST: u32 = 200;
    pub const CHAT_TEXT_QUERY: u32 = 501;
    // Server, session scope.
    pub const SESSION_STARTED: u32 = 150;
    pub const SESSION_FINISHED: u32 = 152;
    pub const SESSION_FAILED: u32 = 153;
    pub const TTS_RESPONSE: u32 = 352;
    pub const TTS_ENDED: u32 = 359;
    pub const ASR_INFO: u32 = 450;
    pub const ASR_RESPONSE: u32 = 451;
    pub const ASR_ENDED: u32 = 459;
    pub const CHAT_RESPONSE: u32 = 550;
    pub const CHAT_ENDED: u32 = 559;
    pub const DIALOG_COMMON_ERROR: u32 = 599;

    pub fn name(id: u32) -> &'static str {
        match id {
            START_CONNECTION => "StartConnection",
            FINISH_CONNECTION => "FinishConnection",
            CONNECTION_STARTED => "ConnectionStarted",
            CONNECTION_FAILED => "ConnectionFailed",
            CONNECTION_FINISHED => "ConnectionFinished",
            START_SESSION => "StartSession",
            FINISH_SESSION => "FinishSession",
            TASK_REQUEST => "TaskRequest",
            CHAT_TEXT_QUERY => "ChatTextQuery",
            SESSION_STARTED => "SessionStarted",
            SESSION_FINISHED => "SessionFinished",
            SESSION_FAILED => "SessionFailed",
            TTS_RESPONSE => "TTSResponse",
            TTS_ENDED => "TTSEnded",
            ASR_INFO => "ASRInfo",
            ASR_RESPONSE => "ASRResponse",
            ASR_ENDED => "ASREnded",
            CHAT_RESPONSE => "ChatResponse",
            CHAT_ENDED => "ChatEnded",
            DIALOG_COMMON_ERROR => "DialogCommonError",
            _ => "Unknown",
        }
    }
}

/// Builds one outbound frame.
pub fn encode_frame(
    message_type: u8,
    serialization: u8,
    event: u32,
    session_id: Option<&str>,
    payload: &[u8],
) -> Bytes {
    let session_len = session_id.map_or(0, |id| 4 + id.len());
    let mut buf = BytesMut::with_capacity(HEADER_LEN + session_len + 4 + payload.len());
    buf.put_u8(VERSION_AND_HEADER_SIZE);
    buf.put_u8((message_type << 4) | FLAG_WITH_EVENT);
    buf.put_u8(serialization << 4);
    buf.put_u8(0);
    buf.put_u32(event);
    if let Some(id) = session_id {
        buf.put_u32(id.len() as u32);
        buf.put_slice(id.as_bytes());
    }
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}
