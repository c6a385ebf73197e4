//! Generic OpenAI-compatible LLM client
//!
//! Speaks the chat completions wire format used by OpenAI and the many
//! providers that mirror it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use url::Url;

use distill_core::{DistillError, LlmRequest, LlmResponse, Message, Runnable, TokenUsage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    default_model: String,
    temperature: Option<f32>,
    timeout: Duration,
    limiter: Arc<Semaphore>,
}

impl fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<SecretString>,
    default_model: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    http: Option<Client>,
    limiter: Option<Arc<Semaphore>>,
}

impl fmt::Debug for OpenAiCompatibleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("OpenAiCompatibleBuilder")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("api_key", &api_key)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, DistillError> {
        let url = Url::parse(base_url.as_ref())
            .map_err(|err| DistillError::InvalidConfig(format!("invalid base_url: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reuse a connection pool shared with other clients.
    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Bound the number of in-flight requests, possibly shared with other clients.
    pub fn limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, DistillError> {
        let base_url = self
            .base_url
            .ok_or_else(|| DistillError::InvalidConfig("base_url is required".to_string()))?;
        let api_key = self
            .api_key
            .ok_or_else(|| DistillError::InvalidConfig("api_key is required".to_string()))?;
        let default_model = self
            .default_model
            .ok_or_else(|| DistillError::InvalidConfig("default_model is required".to_string()))?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http = match self.http {
            Some(http) => http,
            None => Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| DistillError::InvalidConfig(err.to_string()))?,
        };

        Ok(OpenAiCompatibleClient {
            http,
            base_url,
            api_key,
            default_model,
            temperature: self.temperature,
            timeout,
            limiter: self
                .limiter
                .unwrap_or_else(|| Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY))),
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn transport_error(&self, err: reqwest::Error) -> DistillError {
        if err.is_timeout() {
            DistillError::Timeout(self.timeout)
        } else {
            DistillError::LlmProvider(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, DistillError> {
        let LlmRequest {
            model,
            messages,
            temperature,
        } = input;
        let model = if model.is_empty() {
            self.default_model.clone()
        } else {
            model
        };
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: temperature.or(self.temperature),
            stream: false,
        };

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|err| DistillError::LlmProvider(err.to_string()))?;

        tracing::debug!(model = %request.model, "sending chat completion");
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|err| err.error.message)
                .unwrap_or_else(|_| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        body
                    }
                });
            tracing::warn!(
                model = %request.model,
                status = status.as_u16(),
                "chat completion rejected"
            );
            return Err(DistillError::ProviderStatus {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| DistillError::MalformedCompletion(err.to_string()))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DistillError::MalformedCompletion("no choices returned".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: completion.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }
}
