use crate::error::AiYouError;
use crate::stream::StreamConfig;
use crate::types::Temperature;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://ai.dragonflygroup.fr/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.0;

/// Retry configuration for whole requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub retry_delay: Duration,
    /// Upper bound for the delay before jitter
    pub max_delay: Duration,
    /// Seed for the jitter source; drawn from OS entropy when unset
    pub jitter_seed: Option<u64>,
}

impl RetryConfig {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            max_delay: retry_delay.saturating_mul(4),
            jitter_seed: None,
        }
    }

    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// Randomness source used for backoff jitter of one request
    pub fn jitter_rng(&self) -> StdRng {
        match self.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Options shared by every request of an `AiYouClient`
#[derive(Debug, Clone, Serialize)]
pub struct ClientOptions {
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    /// Sampling temperature (0.0-1.0)
    pub temperature: Temperature,
    /// Timeout applied to every HTTP request
    pub timeout: Duration,
    /// Retry configuration; `None` sends each request once
    pub retry: Option<RetryConfig>,
    /// System prompt sent with each completion
    pub system_prompt: String,
    /// Request a server-sent-event stream instead of a single JSON answer
    pub stream: bool,
    /// Log requests, raw responses and stream events at debug level
    pub debug: bool,
    /// Assistant to route the completion to
    pub assistant_id: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: Temperature(DEFAULT_TEMPERATURE),
            timeout: DEFAULT_TIMEOUT,
            retry: None,
            system_prompt: String::new(),
            stream: false,
            debug: false,
            assistant_id: String::new(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the temperature; values outside 0.0-1.0 keep the current one
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            self.temperature = Temperature(temperature);
        }
        self
    }

    /// Set the request timeout; a zero timeout is ignored
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Enable retries; ignored unless both count and delay are positive
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        if max_retries > 0 && !retry_delay.is_zero() {
            self.retry = Some(RetryConfig::new(max_retries, retry_delay));
        }
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = assistant_id.into();
        self
    }

    /// Set the base URL; an empty URL keeps the current one
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Settings handed to the stream aggregator
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig { debug: self.debug }
    }

    /// Headers sent with every request
    pub fn headers(&self, token: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AiYouError> {
        if self.base_url.is_empty() {
            return Err(AiYouError::configuration("Base URL is required"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AiYouError::configuration(
                "Base URL must be a valid HTTP/HTTPS URL",
            ));
        }

        Ok(())
    }

    /// Create options from environment variables, starting from the defaults
    pub fn from_env() -> Result<Self, AiYouError> {
        let mut options = Self::default();

        if let Ok(base_url) = std::env::var("AIYOU_BASE_URL") {
            options = options.with_base_url(base_url);
        }

        if let Ok(timeout) = std::env::var("AIYOU_TIMEOUT_SECONDS") {
            let seconds: u64 = timeout.trim().parse().map_err(|_| {
                AiYouError::configuration(format!(
                    "AIYOU_TIMEOUT_SECONDS must be a number of seconds, got '{timeout}'"
                ))
            })?;
            options = options.with_timeout(Duration::from_secs(seconds));
        }

        if let Ok(debug) = std::env::var("AIYOU_DEBUG") {
            options = options.with_debug(matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ));
        }

        options.validate()?;
        Ok(options)
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, AiYouError> {
        let file: OptionsFile = toml::from_str(content).map_err(|e| {
            AiYouError::configuration(format!("Failed to parse client options: {e}"))
        })?;
        let options = file.into_options();
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AiYouError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AiYouError::configuration(format!(
                "Failed to read client options from {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

/// On-disk form of `ClientOptions`; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    base_url: Option<String>,
    temperature: Option<f64>,
    timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    jitter_seed: Option<u64>,
    system_prompt: Option<String>,
    stream: Option<bool>,
    debug: Option<bool>,
    assistant_id: Option<String>,
}

impl OptionsFile {
    fn into_options(self) -> ClientOptions {
        let mut options = ClientOptions::default();

        if let Some(base_url) = self.base_url {
            options = options.with_base_url(base_url);
        }
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        if let Some(seconds) = self.timeout_seconds {
            options = options.with_timeout(Duration::from_secs(seconds));
        }
        if let (Some(max_retries), Some(delay_ms)) = (self.max_retries, self.retry_delay_ms) {
            options = options.with_retry(max_retries, Duration::from_millis(delay_ms));
        }
        if let Some(seed) = self.jitter_seed {
            options.retry = options.retry.map(|retry| retry.with_jitter_seed(seed));
        }
        if let Some(prompt) = self.system_prompt {
            options = options.with_system_prompt(prompt);
        }
        if let Some(stream) = self.stream {
            options = options.with_stream(stream);
        }
        if let Some(debug) = self.debug {
            options = options.with_debug(debug);
        }
        if let Some(assistant_id) = self.assistant_id {
            options = options.with_assistant_id(assistant_id);
        }

        options
    }
}
