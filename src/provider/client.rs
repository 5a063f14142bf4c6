/// Groq chat-completions client implementation.
///
/// This module provides `GroqClient` for making HTTP requests to Groq's
/// OpenAI-compatible API, along with error types and the builder used to
/// configure it.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::sse::read_stream;

/// Default API root for Groq's OpenAI-compatible endpoints.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Receives answer fragments as they stream in.
pub type DeltaSink<'a> = &'a mut (dyn for<'d> FnMut(&'d str) + Send);

/// Errors that can occur when talking to the hosted model.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key was configured
    #[error("GROQ_API_KEY not found. Please export it before running.")]
    MissingApiKey,

    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success HTTP status, with whatever message the provider returned
    #[error("HTTP error: status {status}: {message}")]
    Http { status: u16, message: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Provider-specific errors reported inside a successful response
    #[error("Provider API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// The hosted agent the answerer delegates to.
///
/// Implementations receive a fully built prompt and return Markdown. The trait
/// exists so request handling can be tested with a mock agent.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Identifier of the model answering requests.
    fn model(&self) -> &str;

    /// Generates a complete answer for `prompt`.
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError>;

    /// Generates an answer, calling `on_delta` with each fragment as it
    /// arrives, and returns the full text.
    ///
    /// The default implementation delivers the whole answer as one fragment.
    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f64,
        on_delta: DeltaSink<'_>,
    ) -> Result<String, ProviderError> {
        let text = self.generate(prompt, temperature).await?;
        on_delta(&text);
        Ok(text)
    }
}

/// Builder for constructing `GroqClient` instances.
///
/// # Examples
///
/// ```
/// use terranaut::provider::GroqClientBuilder;
///
/// let client = GroqClientBuilder::new()
///     .api_key("gsk_test")
///     .base_url("https://api.groq.com/openai/v1")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct GroqClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    instructions: Option<String>,
}

impl GroqClientBuilder {
    /// Creates a new `GroqClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key, overriding `GROQ_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API root (e.g., "https://api.groq.com/openai/v1").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier (e.g., "llama-3.1-8b-instant").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system instructions sent ahead of every prompt.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Builds the `GroqClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Values not set on the builder fall back to `GROQ_API_KEY`,
    /// `GROQ_BASE_URL` and `GROQ_MODEL`. The API key is required; the base URL
    /// defaults to [`DEFAULT_BASE_URL`] and the model to [`DEFAULT_MODEL`].
    pub fn build(self) -> Result<GroqClient, ProviderError> {
        let api_key = self
            .api_key
            .or_else(|| env_value("GROQ_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let base_url = self
            .base_url
            .or_else(|| env_value("GROQ_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let model = self
            .model
            .or_else(|| env_value("GROQ_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        reqwest::Url::parse(&base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(GroqClient {
            http,
            api_key,
            base_url,
            model,
            instructions: self.instructions,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// HTTP client for Groq's chat completions API.
///
/// Should be constructed using `GroqClientBuilder`.
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    instructions: Option<String>,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GroqClient {
    /// Returns the API root configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_request<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = self.instructions.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: instructions,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature,
            stream,
        }
    }

    /// Sends a chat completion request and returns the successful response.
    ///
    /// Transient failures are retried; the body is not consumed.
    async fn send(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let url = url.as_str();
        let http = &self.http;
        let api_key = self.api_key.as_str();

        retry_with_backoff(move || async move {
            let response = http
                .post(url)
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            })
        })
        .await
    }
}

#[async_trait]
impl AgentClient for GroqClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let request = self.chat_request(prompt, temperature, false);
        let response = self.send(&request).await?;
        let body = response.text().await?;

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(ProviderError::Serialization)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Api {
                message: "Missing 'choices[0].message.content' in API response".to_string(),
            })
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f64,
        on_delta: DeltaSink<'_>,
    ) -> Result<String, ProviderError> {
        let request = self.chat_request(prompt, temperature, true);
        let response = self.send(&request).await?;

        read_stream(response.bytes_stream(), on_delta).await
    }
}

/// Pulls the provider's error message out of an error body, falling back to
/// the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Retries an async operation with exponential backoff.
///
/// This function will retry the operation up to 3 times with delays of 1s, 2s, and 4s.
/// It only retries on transient errors (network errors, timeouts, HTTP 429 and 5xx).
pub async fn retry_with_backoff<F, Fut, T>(mut f: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    const DELAYS: [u64; 3] = [1, 2, 4]; // seconds

    let mut last_error = match f().await {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for (attempt, &delay_secs) in DELAYS.iter().enumerate() {
        warn!(
            attempt = attempt + 1,
            delay_secs,
            error = %last_error,
            "transient provider error, retrying"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;

        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

/// Returns `true` for transient errors worth another attempt.
fn should_retry(error: &ProviderError) -> bool {
    match error {
        ProviderError::Network(_) | ProviderError::Timeout(_) => true,
        ProviderError::Http { status, .. } => *status == 429 || (500..600).contains(status),
        ProviderError::MissingApiKey
        | ProviderError::Serialization(_)
        | ProviderError::Api { .. }
        | ProviderError::InvalidUrl(_) => false,
    }
}
