use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use url::Url;

use distill_core::{DistillError, ModelHandle, ModelRequest, ModelResolver, Retrying};

use crate::OpenAiCompatibleClient;

/// Model identifiers the resolver accepts.
pub const SUPPORTED_MODELS: [&str; 3] = ["gpt-3.5-turbo", "gpt-3.5-turbo-16k", "gpt-4"];

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_MAX_CONCURRENCY: usize = 10;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Resolves OpenAI chat models into retrying, rate-limited clients.
///
/// Handles share one connection pool and one concurrency limit.
#[derive(Clone, Debug)]
pub struct OpenAiModelResolver {
    base_url: Url,
    timeout: Duration,
    max_retries: usize,
    retry_base_delay: Duration,
    http: Client,
    limiter: Arc<Semaphore>,
}

#[derive(Clone, Debug)]
pub struct OpenAiModelResolverBuilder {
    base_url: String,
    timeout: Duration,
    max_retries: usize,
    max_concurrency: usize,
    retry_base_delay: Duration,
}

impl Default for OpenAiModelResolverBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl OpenAiModelResolverBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn build(self) -> Result<OpenAiModelResolver, DistillError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|err| DistillError::InvalidConfig(format!("invalid base_url: {err}")))?;
        if self.max_concurrency == 0 {
            return Err(DistillError::InvalidConfig(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| DistillError::InvalidConfig(err.to_string()))?;

        Ok(OpenAiModelResolver {
            base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
            http,
            limiter: Arc::new(Semaphore::new(self.max_concurrency)),
        })
    }
}

impl OpenAiModelResolver {
    pub fn builder() -> OpenAiModelResolverBuilder {
        OpenAiModelResolverBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Permits currently free in the shared concurrency limit.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    pub fn is_supported(model: &str) -> bool {
        SUPPORTED_MODELS.contains(&model)
    }
}

impl ModelResolver for OpenAiModelResolver {
    fn resolve(&self, request: &ModelRequest) -> Result<ModelHandle, DistillError> {
        if !Self::is_supported(&request.name) {
            tracing::warn!(model = %request.name, "model is not supported");
            return Err(DistillError::ModelUnavailable {
                model: request.name.clone(),
            });
        }
        let Some(api_key) = request.api_key() else {
            tracing::warn!(model = %request.name, "model requested without an api key");
            return Err(DistillError::CredentialMissing {
                model: request.name.clone(),
            });
        };

        let client = OpenAiCompatibleClient::builder()
            .base_url(self.base_url.as_str())?
            .api_key(api_key)
            .default_model(request.name.clone())
            .temperature(0.0)
            .timeout(self.timeout)
            .http_client(self.http.clone())
            .limiter(self.limiter.clone())
            .build()?;
        let llm = Retrying::new(client, self.max_retries).with_base_delay(self.retry_base_delay);

        tracing::debug!(model = %request.name, max_retries = self.max_retries, "resolved model");
        Ok(ModelHandle::new(request.name.clone(), Arc::new(llm)))
    }
}
