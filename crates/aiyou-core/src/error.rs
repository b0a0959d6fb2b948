use std::time::Duration;
use thiserror::Error;

/// Main error type for the AI.You client
#[derive(Error, Debug)]
pub enum AiYouError {
    /// Network-related errors, including failed reads of a response body
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}. Retry after: {retry_after:?}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Non-success HTTP responses from the API
    #[error("API error: {message} (code: {code:?})")]
    Api {
        message: String,
        code: Option<u16>,
        body: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Validation errors for requests
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Timeout errors
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An SSE event payload could not be decoded as a completion chunk
    #[error("Stream corrupted: {message}")]
    StreamCorrupted {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every attempt of a retried request failed
    #[error("Max retries exceeded after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AiYouError>,
    },
}

impl AiYouError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Create an API error
    pub fn api(message: impl Into<String>, code: Option<u16>, body: Option<String>) -> Self {
        Self::Api {
            message: message.into(),
            code,
            body,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a serialization error
    pub fn serialization(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Create a stream corrupted error
    pub fn stream_corrupted(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StreamCorrupted {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap the last failure of a retried request
    pub fn retries_exhausted(attempts: u32, last: AiYouError) -> Self {
        Self::RetriesExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Check if the error is worth another attempt of the whole request
    pub fn is_retryable(&self) -> bool {
        match self {
            AiYouError::Network { .. } => true,
            AiYouError::RateLimit { .. } => true,
            AiYouError::Timeout { .. } => true,
            AiYouError::Api { code, .. } => code.is_some_and(|c| c >= 500),
            _ => false,
        }
    }

    /// Returns true for the stream corrupted classification
    pub fn is_stream_corrupted(&self) -> bool {
        matches!(self, AiYouError::StreamCorrupted { .. })
    }
}

/// Convert from reqwest errors
impl From<reqwest::Error> for AiYouError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiYouError::network_with_source("Request timed out", err)
        } else if err.is_connect() {
            AiYouError::network_with_source("Connection failed", err)
        } else if err.is_builder() {
            AiYouError::configuration(format!("Invalid request: {err}"))
        } else {
            AiYouError::network_with_source("HTTP request failed", err)
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for AiYouError {
    fn from(err: serde_json::Error) -> Self {
        AiYouError::serialization("JSON serialization failed", err)
    }
}
