// Generator configuration
//
// Settings are read from the environment (after dotenvy has loaded .env) with
// defaults for everything except the API key. `from_lookup` takes any key
// lookup so parsing can be tested without touching process env.

/// Default DeepSeek endpoint base
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Default model for every LLM-backed step
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// LLM connection settings
#[derive(Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Temperature for template-style generation (linear UI step)
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.4,
        }
    }
}

impl LlmSettings {
    /// Load settings from environment variables
    ///
    /// - DEEPSEEK_API_KEY (fallback LLM_API_KEY)
    /// - DEEPSEEK_BASE_URL (default https://api.deepseek.com)
    /// - DEEPSEEK_MODEL (default deepseek-chat)
    /// - DEEPSEEK_TEMPERATURE (default 0.4, clamped to 0..=2)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let temperature = non_empty("DEEPSEEK_TEMPERATURE")
            .and_then(|value| value.trim().parse::<f32>().ok())
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 2.0))
            .unwrap_or(defaults.temperature);

        Self {
            api_key: non_empty("DEEPSEEK_API_KEY").or_else(|| non_empty("LLM_API_KEY")),
            base_url: non_empty("DEEPSEEK_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty("DEEPSEEK_MODEL").unwrap_or(defaults.model),
            temperature,
        }
    }

    /// Full chat completions endpoint derived from the base URL
    pub fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Supervisor pipeline tuning
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub model: String,
    /// Maximum number of feedback rounds per session
    pub max_iterations: u32,
    pub requirements_temperature: f32,
    pub code_temperature: f32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_iterations: 5,
            requirements_temperature: 0.3,
            code_temperature: 0.7,
        }
    }
}

impl SupervisorConfig {
    /// Load from environment (MAX_ITERATIONS), taking the model from LLM settings
    pub fn from_env(llm: &LlmSettings) -> Self {
        Self::from_lookup(llm, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(llm: &LlmSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model: llm.model.clone(),
            max_iterations: lookup("MAX_ITERATIONS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.max_iterations),
            ..defaults
        }
    }
}
