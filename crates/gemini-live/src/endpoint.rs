use live_types::WireRequest;

pub const DEFAULT_BASE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-live-001";

/// Builds the connection request. The API key rides in the query string.
pub fn endpoint(base_url: Option<&str>, api_key: &str) -> WireRequest {
    let base = base_url.unwrap_or(DEFAULT_BASE_URL);
    WireRequest::new(format!("{base}?key={api_key}"))
}

/// Model names on the wire carry the `models/` prefix.
pub fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
