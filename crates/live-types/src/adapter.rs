use crate::{
    config::{LiveConfig, ToolSchema},
    error::Result,
    event::LiveEvent,
    frame::Frame,
    handshake::HandshakeTable,
    message::ClientMessage,
    vendor::Vendor,
};

/// The per-vendor encode/decode contract the session engine drives.
///
/// Adapters are pure codecs: they never touch the connection. Builders return
/// `Ok(None)` when the vendor needs no message for that step.
pub trait ProtocolAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// The handshake this vendor speaks.
    fn handshake(&self) -> &'static HandshakeTable;

    /// The first message(s) to send after the connection opens.
    fn build_handshake_open(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Option<Frame>>;

    /// A session configuration message, used during the handshake and for later updates.
    fn build_session_config(&self, config: &LiveConfig, tools: &[ToolSchema]) -> Result<Option<Frame>>;

    /// The second handshake message of two-phase vendors.
    fn build_start_session(&self, _config: &LiveConfig, _resume_token: Option<&str>) -> Result<Option<Frame>> {
        Ok(None)
    }

    /// Encodes an application message, or `None` when the vendor does not support its kind.
    fn encode_application_message(&self, message: &ClientMessage) -> Result<Option<Frame>>;

    /// Decodes one inbound frame.
    ///
    /// Malformed input is an error; well-formed frames this layer does not
    /// understand decode to [`EventPayload::Other`](crate::EventPayload::Other).
    fn decode(&self, frame: &Frame) -> Result<LiveEvent>;

    /// Decodes one inbound frame into every event it carries, in order.
    ///
    /// Vendors that bundle several updates into one frame override this;
    /// the session engine always reads frames through it.
    fn decode_all(&self, frame: &Frame) -> Result<Vec<LiveEvent>> {
        self.decode(frame).map(|event| vec![event])
    }

    /// Whether `build_session_config` may be re-sent after the handshake.
    fn supports_config_update(&self) -> bool {
        true
    }

    /// Frames to send, best-effort, before closing the connection.
    fn build_close(&self) -> Vec<Frame> {
        Vec::new()
    }
}
