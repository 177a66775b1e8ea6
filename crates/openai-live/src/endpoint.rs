use live_types::WireRequest;

pub const DEFAULT_BASE_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";

/// Builds the connection request: model in the query, bearer auth and the beta header.
pub fn endpoint(base_url: Option<&str>, model: &str, api_key: &str) -> WireRequest {
    let base = base_url.unwrap_or(DEFAULT_BASE_URL);
    WireRequest::new(format!("{base}?model={model}"))
        .with_header("Authorization", format!("Bearer {api_key}"))
        .with_header("OpenAI-Beta", "realtime=v1")
}
