use bytes::Bytes;
use std::fmt;

/// One discrete unit of transport-level data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The frame as UTF-8 text, if it is a text frame or a binary frame holding valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(text) => Some(text),
            Frame::Binary(data) => std::str::from_utf8(data).ok(),
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Frame::Binary(data)
    }
}

/// Why the peer closed the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

/// Everything needed to open a connection to a vendor.
///
/// URLs and header values may carry credentials, so `Debug` prints the URL
/// without its query string and only the header names.
#[derive(Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl WireRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.url.split('?').next().unwrap_or_default();
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("WireRequest")
            .field("url", &url)
            .field("headers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_debug_hides_secrets() {
        let request = WireRequest::new("wss://example.test/ws?key=secret-key")
            .with_header("Authorization", "Bearer secret-token");
        let printed = format!("{request:?}");
        assert!(printed.contains("wss://example.test/ws"));
        assert!(printed.contains("Authorization"));
        assert!(!printed.contains("secret"));
        assert_eq!(request.header("authorization"), Some("Bearer secret-token"));
    }

    #[test]
    fn test_frame_as_text() {
        assert_eq!(Frame::Text("{}".into()).as_text(), Some("{}"));
        assert_eq!(Frame::Binary(Bytes::from_static(b"{}")).as_text(), Some("{}"));
        assert_eq!(Frame::Binary(Bytes::from_static(&[0xff, 0xfe])).as_text(), None);
    }
}
