//! Turn unstructured text into schema-shaped JSON.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use distill::{ModelRequest, Settings};
//!
//! let settings = Settings::from_env()?;
//! distill::telemetry::init_tracing(&settings.log_filter)?;
//! let service = distill::json_service(&settings)?;
//!
//! let model = ModelRequest::new("gpt-3.5-turbo").with_api_key("sk-...");
//! let extraction = service
//!     .extract_with_schema("This is a text", &model, r#"{"title":"string"}"#, false)
//!     .await?;
//! println!("{}", extraction.json);
//! # Ok(())
//! # }
//! ```

mod config;
pub mod telemetry;

pub use config::{ConfigError, Settings, DEFAULT_LOG_FILTER, DEFAULT_OPENAI_BASE_URL};

pub use distill_chains as chains;
pub use distill_core;
pub use distill_prompt as prompt;
pub use distill_text as text;

#[cfg(feature = "openai")]
pub use distill_llm as llm;

pub use distill_chains::{
    Example, JsonService, RefineRecap, RefinedExtraction, SchemaExtraction,
};
pub use distill_core::{DistillError, ErrorClass, ExecutionTrace, ModelRequest};
pub use distill_text::ChunkParams;

/// Builds the OpenAI resolver described by `settings`.
#[cfg(feature = "openai")]
pub fn resolver(settings: &Settings) -> Result<distill_llm::OpenAiModelResolver, DistillError> {
    distill_llm::OpenAiModelResolver::builder()
        .base_url(settings.openai_base_url.clone())
        .timeout(settings.request_timeout)
        .max_retries(settings.max_retries)
        .max_concurrency(settings.max_concurrency)
        .build()
}

/// Wires a [`JsonService`] over the OpenAI resolver described by `settings`.
#[cfg(feature = "openai")]
pub fn json_service(
    settings: &Settings,
) -> Result<JsonService<distill_llm::OpenAiModelResolver>, DistillError> {
    Ok(JsonService::new(resolver(settings)?).with_default_chunk_params(settings.chunk_params))
}
