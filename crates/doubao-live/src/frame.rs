use crate::protocol::HEADER_LEN;
use std::borrow::Cow;

/// A borrowed view over one inbound binary frame.
///
/// Parsing never fails: accessors return `None` or an empty slice when the
/// frame is too short to hold the field.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The big-endian event id at offset 4, or `None` for frames shorter than the header.
    pub fn event_id(&self) -> Option<u32> {
        parse_event_id(self.bytes)
    }

    pub fn message_type(&self) -> Option<u8> {
        self.bytes.get(1).map(|b| b >> 4)
    }

    /// Everything after the 8-byte header.
    pub fn payload(&self) -> &'a [u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or_default()
    }

    /// The payload as text, with invalid UTF-8 (length prefixes included) replaced.
    pub fn payload_text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.payload())
    }

    /// The payload with its length prefixes stripped.
    ///
    /// Accepts `[sid_len][sid][len][data]` and `[len][data]`; anything else
    /// falls back to the whole payload.
    pub fn body(&self) -> &'a [u8] {
        let payload = self.payload();
        if let Some(first) = read_len(payload, 0) {
            let second_at = 4 + first;
            if let Some(second) = read_len(payload, second_at) {
                if second_at + 4 + second == payload.len() {
                    return &payload[second_at + 4..];
                }
            }
            if 4 + first == payload.len() {
                return &payload[4..];
            }
        }
        payload
    }
}

/// Reads the event id of a binary frame; `None` when fewer than 8 bytes are present.
pub fn parse_event_id(bytes: &[u8]) -> Option<u32> {
    let id: [u8; 4] = bytes.get(4..HEADER_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(id))
}

fn read_len(bytes: &[u8], at: usize) -> Option<usize> {
    let raw: [u8; 4] = bytes.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_frame, event, message_type, serialization};

    #[test]
    fn test_event_id_at_offset_four() {
        let frame = [0xAA, 0xBB, 0xCC, 0xDD, 0x00, 0x00, 0x00, 0x32];
        assert_eq!(parse_event_id(&frame), Some(50));
        assert_eq!(RawFrame::new(&frame).payload(), &[] as &[u8]);
    }

    #[test]
    fn test_short_frame_is_invalid() {
        assert_eq!(parse_event_id(&[0x11, 0x94, 0x10, 0x00]), None);
        assert_eq!(parse_event_id(&[]), None);
        assert_eq!(RawFrame::new(&[0x11]).payload(), &[] as &[u8]);
    }

    #[test]
    fn test_body_strips_prefixes() {
        let with_session = encode_frame(
            message_type::FULL_SERVER,
            serialization::JSON,
            event::SESSION_STARTED,
            Some("sess"),
            br#"{"dialog_id":"d1"}"#,
        );
        let frame = RawFrame::new(&with_session);
        assert_eq!(frame.event_id(), Some(150));
        assert_eq!(frame.message_type(), Some(message_type::FULL_SERVER));
        assert_eq!(frame.body(), br#"{"dialog_id":"d1"}"#);
        assert!(frame.payload_text().contains(r#""dialog_id":"d1""#));

        let connection_level =
            encode_frame(message_type::FULL_SERVER, serialization::JSON, event::CONNECTION_STARTED, None, b"{}");
        assert_eq!(RawFrame::new(&connection_level).body(), b"{}");

        let bare = [0x11, 0x94, 0x10, 0x00, 0, 0, 0, 150, b'{', b'}'];
        assert_eq!(RawFrame::new(&bare).body(), b"{}");
    }
}
