use live_types::WireRequest;

pub const DEFAULT_BASE_URL: &str = "wss://openspeech.bytedance.com/api/v3/realtime/dialogue";
pub const RESOURCE_ID: &str = "volc.speech.dialog";
/// Fixed application key the dialogue service expects from every client.
pub const APP_KEY: &str = "PlgvMymc7f3tQnJ6";

/// Builds the connection request. Auth travels in custom headers.
pub fn endpoint(base_url: Option<&str>, app_id: &str, access_key: &str, connect_id: &str) -> WireRequest {
    WireRequest::new(base_url.unwrap_or(DEFAULT_BASE_URL))
        .with_header("X-Api-App-ID", app_id)
        .with_header("X-Api-Access-Key", access_key)
        .with_header("X-Api-Resource-Id", RESOURCE_ID)
        .with_header("X-Api-App-Key", APP_KEY)
        .with_header("X-Api-Connect-Id", connect_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_headers() {
        let request = endpoint(None, "app-1", "ak-1", "conn-1");
        assert_eq!(request.url, DEFAULT_BASE_URL);
        assert_eq!(request.header("x-api-app-id"), Some("app-1"));
        assert_eq!(request.header("X-Api-Access-Key"), Some("ak-1"));
        assert_eq!(request.header("X-Api-Resource-Id"), Some("volc.speech.dialog"));
        assert_eq!(request.header("X-Api-Connect-Id"), Some("conn-1"));
    }
}
