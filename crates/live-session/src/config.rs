use crate::bus::OverflowPolicy;
use live_types::Vendor;
use secrecy::SecretString;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Static, per-model settings: which vendor to talk to and how to authenticate.
///
/// Session behavior (voice, instructions, tools) is not configured here but
/// passed per call to [`LiveModel::connect`](crate::LiveModel::connect).
#[derive(Debug)]
pub struct ModelConfig {
    pub vendor: Vendor,
    /// Gemini, OpenAI and DashScope API key.
    pub api_key: Option<SecretString>,
    /// Doubao application id.
    pub app_id: Option<String>,
    /// Doubao access key.
    pub access_key: Option<SecretString>,
    /// Overrides the vendor's default model.
    pub model: Option<String>,
    /// Overrides the vendor's default endpoint.
    pub base_url: Option<String>,
    /// Extra headers sent when opening the connection.
    pub headers: Vec<(String, String)>,
    pub overflow: OverflowPolicy,
    /// How many prior dialog turns Doubao replays when a session starts.
    pub max_context_turns: usize,
}

impl ModelConfig {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            api_key: None,
            app_id: None,
            access_key: None,
            model: None,
            base_url: None,
            headers: Vec::new(),
            overflow: OverflowPolicy::default(),
            max_context_turns: doubao_live::adapter::DEFAULT_MAX_CONTEXT_TURNS,
        }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(Vendor::Gemini).with_api_key(api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(Vendor::OpenAI).with_api_key(api_key)
    }

    pub fn qwen(api_key: impl Into<String>) -> Self {
        Self::new(Vendor::Qwen).with_api_key(api_key)
    }

    pub fn doubao(app_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        let mut config = Self::new(Vendor::Doubao);
        config.app_id = Some(app_id.into());
        config.access_key = Some(SecretString::from(access_key.into()));
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_max_context_turns(mut self, turns: usize) -> Self {
        self.max_context_turns = turns;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// `LIVE_PROVIDER` picks the vendor (default `openai`); that vendor's
    /// credentials are then required.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider_str = std::env::var("LIVE_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let vendor = provider_str
            .parse::<Vendor>()
            .map_err(|e| ConfigError::InvalidValue("LIVE_PROVIDER".to_string(), e))?;

        let mut config = Self::new(vendor);
        match vendor {
            Vendor::Gemini => config.api_key = Some(required_secret("GEMINI_API_KEY", vendor)?),
            Vendor::OpenAI => config.api_key = Some(required_secret("OPENAI_API_KEY", vendor)?),
            Vendor::Qwen => config.api_key = Some(required_secret("DASHSCOPE_API_KEY", vendor)?),
            Vendor::Doubao => {
                config.app_id = Some(required("DOUBAO_APP_ID", vendor)?);
                config.access_key = Some(required_secret("DOUBAO_ACCESS_KEY", vendor)?);
            }
        }

        config.model = std::env::var("LIVE_MODEL").ok().filter(|m| !m.is_empty());
        config.base_url = std::env::var("LIVE_BASE_URL").ok().filter(|u| !u.is_empty());
        Ok(config)
    }
}

fn required(name: &str, vendor: Vendor) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(format!("{name} must be set for '{vendor}' provider")))
}

fn required_secret(name: &str, vendor: Vendor) -> Result<SecretString, ConfigError> {
    required(name, vendor).map(SecretString::from)
}
