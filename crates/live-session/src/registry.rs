//! Maps a [`ModelConfig`] to the vendor's adapter and connection request.

use crate::config::{ConfigError, ModelConfig};
use doubao_live::DoubaoAdapter;
use gemini_live::GeminiAdapter;
use live_types::{ProtocolAdapter, Vendor, WireRequest};
use openai_live::OpenAiAdapter;
use qwen_live::QwenAdapter;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

pub(crate) struct Target {
    pub(crate) adapter: Arc<dyn ProtocolAdapter>,
    pub(crate) request: WireRequest,
}

/// Builds the adapter and request for one connection. `session_id` doubles as
/// the connection id for vendors that ask for one.
pub(crate) fn resolve(config: &ModelConfig, session_id: &str) -> Result<Target, ConfigError> {
    let base_url = config.base_url.as_deref();
    let target = match config.vendor {
        Vendor::Gemini => {
            let key = secret(&config.api_key, "GEMINI_API_KEY", config.vendor)?;
            let model = config.model.as_deref().unwrap_or(gemini_live::DEFAULT_MODEL);
            Target {
                adapter: Arc::new(GeminiAdapter::new(model)),
                request: gemini_live::endpoint(base_url, key),
            }
        }
        Vendor::OpenAI => {
            let key = secret(&config.api_key, "OPENAI_API_KEY", config.vendor)?;
            let model = config.model.as_deref().unwrap_or(openai_live::DEFAULT_MODEL);
            Target {
                adapter: Arc::new(OpenAiAdapter::new()),
                request: openai_live::endpoint(base_url, model, key),
            }
        }
        Vendor::Qwen => {
            let key = secret(&config.api_key, "DASHSCOPE_API_KEY", config.vendor)?;
            let model = config.model.as_deref().unwrap_or(qwen_live::DEFAULT_MODEL);
            Target {
                adapter: Arc::new(QwenAdapter::new()),
                request: qwen_live::endpoint(base_url, model, key),
            }
        }
        Vendor::Doubao => {
            let app_id = config
                .app_id
                .as_deref()
                .ok_or_else(|| missing("DOUBAO_APP_ID", config.vendor))?;
            let access_key = secret(&config.access_key, "DOUBAO_ACCESS_KEY", config.vendor)?;
            let adapter = DoubaoAdapter::new(session_id).with_max_context_turns(config.max_context_turns);
            Target {
                adapter: Arc::new(adapter),
                request: doubao_live::endpoint(base_url, app_id, access_key, session_id),
            }
        }
    };

    let request = config
        .headers
        .iter()
        .fold(target.request, |request, (name, value)| request.with_header(name, value));
    Ok(Target { request, ..target })
}

fn secret<'a>(value: &'a Option<SecretString>, name: &str, vendor: Vendor) -> Result<&'a str, ConfigError> {
    value
        .as_ref()
        .map(|secret| secret.expose_secret())
        .ok_or_else(|| missing(name, vendor))
}

fn missing(name: &str, vendor: Vendor) -> ConfigError {
    ConfigError::MissingVar(format!("{name} must be set for '{vendor}' provider"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_each_vendor() {
        let gemini = resolve(&ModelConfig::gemini("g-key"), "s1").expect("gemini");
        assert_eq!(gemini.adapter.vendor(), Vendor::Gemini);
        assert!(gemini.request.url.ends_with("?key=g-key"));

        let openai = resolve(&ModelConfig::openai("o-key").with_model("gpt-realtime"), "s1").expect("openai");
        assert_eq!(openai.request.url, "wss://api.openai.com/v1/realtime?model=gpt-realtime");
        assert_eq!(openai.request.header("authorization"), Some("Bearer o-key"));

        let qwen = resolve(&ModelConfig::qwen("q-key"), "s1").expect("qwen");
        assert_eq!(qwen.adapter.vendor(), Vendor::Qwen);
        assert_eq!(qwen.request.header("X-DashScope-DataInspection"), Some("enable"));

        let doubao = resolve(&ModelConfig::doubao("app", "ak"), "s1").expect("doubao");
        assert_eq!(doubao.adapter.vendor(), Vendor::Doubao);
        assert_eq!(doubao.request.header("X-Api-Connect-Id"), Some("s1"));
    }

    #[test]
    fn test_extra_headers_and_base_url() {
        let config = ModelConfig::openai("o-key")
            .with_base_url("ws://localhost:8080/realtime")
            .with_header("X-Trace", "abc");
        let target = resolve(&config, "s1").expect("resolves");
        assert!(target.request.url.starts_with("ws://localhost:8080/realtime?model="));
        assert_eq!(target.request.header("X-Trace"), Some("abc"));
    }

    #[test]
    fn test_missing_credentials() {
        let result = resolve(&ModelConfig::new(Vendor::Gemini), "s1");
        assert!(matches!(result, Err(ConfigError::MissingVar(ref msg)) if msg.contains("GEMINI_API_KEY")));

        let mut config = ModelConfig::new(Vendor::Doubao);
        config.app_id = Some("app".into());
        let result = resolve(&config, "s1");
        assert!(matches!(result, Err(ConfigError::MissingVar(ref msg)) if msg.contains("DOUBAO_ACCESS_KEY")));
    }
}
