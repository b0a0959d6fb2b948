use crate::config::ClientOptions;
use crate::error::AiYouError;
use crate::retry::run_with_retry;
use crate::stream::{aggregate, delta_stream};
use crate::types::{
    CompletionProvider, CompletionRequest, CompletionResponse, Model, ModelsResponse,
    StreamResult, flatten_models,
};
use crate::utils::debug::{debug_json, debug_log};
use crate::utils::sse::sse_events;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;

/// Client for the AI.You chat-completion API
#[derive(Clone)]
pub struct AiYouClient {
    options: ClientOptions,
    client: Client,
}

impl AiYouClient {
    /// Create a new client authenticated with `token`
    pub fn new(token: impl Into<String>, options: ClientOptions) -> Result<Self, AiYouError> {
        let token = token.into();
        if token.is_empty() {
            return Err(AiYouError::validation("token cannot be empty"));
        }
        options.validate()?;

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(header_map(&options.headers(&token))?)
            .build()
            .map_err(|e| AiYouError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { options, client })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self, AiYouError> {
        let token = std::env::var("AIYOU_API_KEY").map_err(|_| {
            AiYouError::configuration("AIYOU_API_KEY environment variable not set")
        })?;
        Self::new(token, ClientOptions::from_env()?)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// List the models available to this token
    pub async fn list_models(&self) -> Result<Vec<Model>, AiYouError> {
        let url = format!("{}/models", self.options.base_url);
        let debug = self.options.debug;
        let this = self;
        let url = url.as_str();

        run_with_retry(self.options.retry.as_ref(), debug, || async move {
            // The endpoint is a POST that expects an empty JSON object
            let response = this.post(url, Bytes::from_static(b"{}"), false).await?;
            let response = this
                .ensure_status(response, &[StatusCode::OK, StatusCode::CREATED])
                .await?;

            let body = response.bytes().await.map_err(|e| this.transport_error(e))?;
            debug_log!(debug, "Raw response body: {}", String::from_utf8_lossy(&body));

            let models: ModelsResponse = serde_json::from_slice(&body)
                .map_err(|e| AiYouError::serialization("error decoding response", e))?;
            debug_json(debug, "Models Response", &models);

            Ok(flatten_models(models))
        })
        .await
    }

    /// Send `message` to `model` and return the complete answer.
    ///
    /// With `ClientOptions::stream` set, the answer is reassembled from the
    /// server-sent-event stream; otherwise it is read from a single JSON body.
    pub async fn completion(&self, model: &str, message: &str) -> Result<String, AiYouError> {
        if message.is_empty() {
            return Err(AiYouError::validation("message cannot be empty"));
        }

        let debug = self.options.debug;
        let request = CompletionRequest::new(model, message, &self.options);
        debug_json(debug, "Options", &self.options);
        debug_log!(debug, "Stream mode: {}", request.stream);

        if request.stream {
            let response = self.send_completion(&request).await?;
            return aggregate(response.bytes_stream(), self.options.stream_config()).await;
        }

        let body = encode_request(&request, debug)?;
        let url = format!("{}/chat/completions", self.options.base_url);
        let this = self;
        let url = url.as_str();
        let body = &body;

        let response: CompletionResponse =
            run_with_retry(self.options.retry.as_ref(), debug, || async move {
                let response = this.post(url, body.clone(), false).await?;
                let response = this.ensure_status(response, &[StatusCode::OK]).await?;

                let raw = response.bytes().await.map_err(|e| this.transport_error(e))?;
                debug_log!(debug, "Raw response body: {}", String::from_utf8_lossy(&raw));

                let parsed: CompletionResponse = serde_json::from_slice(&raw)
                    .map_err(|e| AiYouError::serialization("error decoding response", e))?;
                debug_json(debug, "Response", &parsed);
                Ok(parsed)
            })
            .await?;

        let choices = response.response.choices;
        debug_log!(debug, "Response choices length: {}", choices.len());

        match choices.into_iter().next() {
            Some(choice) => {
                debug_log!(
                    debug,
                    "First choice details: index={}, finish_reason={:?}, role={}",
                    choice.index,
                    choice.finish_reason,
                    choice.message.role
                );
                Ok(choice.message.content)
            }
            None => Err(AiYouError::api("no content in response", None, None)),
        }
    }

    /// Send `message` to `model` and stream the answer fragment by fragment.
    ///
    /// Streaming is requested regardless of `ClientOptions::stream`. Retries
    /// only cover establishing the response; errors inside the body end the
    /// stream.
    pub async fn completion_stream(
        &self,
        model: &str,
        message: &str,
    ) -> Result<StreamResult<String>, AiYouError> {
        if message.is_empty() {
            return Err(AiYouError::validation("message cannot be empty"));
        }

        let mut request = CompletionRequest::new(model, message, &self.options);
        request.stream = true;

        let response = self.send_completion(&request).await?;
        let events = sse_events(response.bytes_stream());
        Ok(Box::pin(delta_stream(events, self.options.stream_config())))
    }

    /// POST a completion request and return the accepted response, body unread
    async fn send_completion(&self, request: &CompletionRequest) -> Result<Response, AiYouError> {
        let debug = self.options.debug;
        let body = encode_request(request, debug)?;
        let url = format!("{}/chat/completions", self.options.base_url);
        let stream = request.stream;
        let this = self;
        let url = url.as_str();
        let body = &body;

        run_with_retry(self.options.retry.as_ref(), debug, || async move {
            let response = this.post(url, body.clone(), stream).await?;
            this.ensure_status(response, &[StatusCode::OK]).await
        })
        .await
    }

    async fn post(
        &self,
        url: &str,
        body: Bytes,
        event_stream: bool,
    ) -> Result<Response, AiYouError> {
        let mut request = self.client.post(url).body(body);
        if event_stream {
            request = request.header(ACCEPT, "text/event-stream");
        }

        request.send().await.map_err(|e| self.transport_error(e))
    }

    async fn ensure_status(
        &self,
        response: Response,
        accepted: &[StatusCode],
    ) -> Result<Response, AiYouError> {
        let debug = self.options.debug;
        let status = response.status();

        if accepted.contains(&status) {
            debug_log!(debug, "Request successful: {status}");
            return Ok(response);
        }

        let error = http_error(response, debug).await;
        debug_log!(debug, "HTTP error: {error}");
        Err(error)
    }

    fn transport_error(&self, err: reqwest::Error) -> AiYouError {
        if err.is_timeout() {
            AiYouError::timeout(self.options.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for AiYouClient {
    async fn list_models(&self) -> Result<Vec<Model>, AiYouError> {
        AiYouClient::list_models(self).await
    }

    async fn completion(&self, model: &str, message: &str) -> Result<String, AiYouError> {
        AiYouClient::completion(self, model, message).await
    }

    async fn completion_stream(
        &self,
        model: &str,
        message: &str,
    ) -> Result<StreamResult<String>, AiYouError> {
        AiYouClient::completion_stream(self, model, message).await
    }
}

fn encode_request(request: &CompletionRequest, debug: bool) -> Result<Bytes, AiYouError> {
    let body = serde_json::to_vec(request).map_err(|e| {
        debug_log!(debug, "Error marshaling request: {e}");
        AiYouError::serialization("error marshaling request", e)
    })?;
    debug_json(debug, "Request", request);
    Ok(Bytes::from(body))
}

/// Maps a non-success response to a typed error, consuming its body
async fn http_error(response: Response, debug: bool) -> AiYouError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug_log!(debug, "Raw error response body: {body}");

    match status {
        StatusCode::UNAUTHORIZED => AiYouError::authentication("invalid token"),
        StatusCode::TOO_MANY_REQUESTS => AiYouError::rate_limit("rate limit exceeded", None),
        StatusCode::BAD_REQUEST => {
            AiYouError::api(format!("bad request: {body}"), Some(status.as_u16()), Some(body))
        }
        _ => AiYouError::api(
            format!("HTTP error {}: {status}", status.as_u16()),
            Some(status.as_u16()),
            (!body.is_empty()).then_some(body),
        ),
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, AiYouError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| AiYouError::configuration(format!("Invalid header name {key}: {e}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| AiYouError::configuration(format!("Invalid value for header {key}")))?;
        if name == AUTHORIZATION {
            value.set_sensitive(true);
        }
        map.insert(name, value);
    }
    Ok(map)
}
