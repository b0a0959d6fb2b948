use crate::config::ClientOptions;
use crate::error::AiYouError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::pin::Pin;

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One typed part of a message body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Message as sent to the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: ChatRole,
    pub content: Vec<ContentPart>,
}

impl ApiMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: vec![ContentPart::text(text)],
        }
    }
}

/// Sampling temperature, always written to the wire as a float with one decimal
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize)]
pub struct Temperature(pub f64);

impl Temperature {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Serialize for Temperature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64((self.0 * 10.0).round() / 10.0)
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(rename = "assistantId", skip_serializing_if = "String::is_empty")]
    pub assistant_id: String,
    pub temperature: Temperature,
    pub stream: bool,
    #[serde(rename = "promptSystem", skip_serializing_if = "String::is_empty")]
    pub prompt_system: String,
}

impl CompletionRequest {
    /// Builds a single-turn user request from the client options
    pub fn new(model: &str, message: &str, options: &ClientOptions) -> Self {
        Self {
            messages: vec![ApiMessage::user(message)],
            model: model.to_string(),
            assistant_id: options.assistant_id.clone(),
            temperature: options.temperature,
            stream: options.stream,
            prompt_system: options.system_prompt.clone(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Usage {
    #[serde(deserialize_with = "null_as_default")]
    pub prompt_tokens: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub completion_tokens: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_tokens: u32,
}

/// Non-streaming answer; the API nests the completion under `response`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub response: CompletionBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionBody {
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(deserialize_with = "null_as_default")]
    pub usage: Usage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Choice {
    #[serde(deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
    pub refusal: Option<String>,
}

/// One decoded SSE event of a streamed completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionChunk {
    pub id: Option<String>,
    pub model: Option<String>,
    pub created: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub choices: Vec<StreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Non-empty content fragments, in the order the choices were sent
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter_map(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamChoice {
    #[serde(deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Incremental content carried by a streamed choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Context window size, sent by the backend either as a number or a numeric string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextWindow(pub u64);

impl<'de> Deserialize<'de> for ContextWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer) {
            Ok(Raw::Text(value)) => value.parse().map(ContextWindow).map_err(|_| {
                D::Error::custom(format!("invalid context window string value: {value}"))
            }),
            Ok(Raw::Number(value)) => Ok(ContextWindow(value)),
            Err(_) => Err(D::Error::custom(
                "context window must be a string or integer",
            )),
        }
    }
}

/// A model available on the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<ContextWindow>,
}

/// Models grouped under one backend provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderModels {
    #[serde(deserialize_with = "null_as_default")]
    pub models: Vec<Model>,
}

/// Body returned by `POST /models`
pub type ModelsResponse = Vec<ProviderModels>;

/// Flattens the per-provider listing into one list, keeping order
pub fn flatten_models(response: ModelsResponse) -> Vec<Model> {
    response
        .into_iter()
        .flat_map(|provider| provider.models)
        .collect()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Type alias for streaming results
pub type StreamResult<T> = Pin<Box<dyn futures::Stream<Item = Result<T, AiYouError>> + Send>>;

/// Operations offered by a chat-completion backend
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// List the models the backend exposes
    async fn list_models(&self) -> Result<Vec<Model>, AiYouError>;

    /// Send a single-turn prompt and return the full answer
    async fn completion(&self, model: &str, message: &str) -> Result<String, AiYouError>;

    /// Send a single-turn prompt and stream the answer fragment by fragment
    async fn completion_stream(
        &self,
        model: &str,
        message: &str,
    ) -> Result<StreamResult<String>, AiYouError>;
}
