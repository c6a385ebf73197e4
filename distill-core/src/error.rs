use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistillError {
    #[error("Model {model} is not available")]
    ModelUnavailable { model: String },
    #[error("API key for model {model} is missing")]
    CredentialMissing { model: String },
    #[error("API key for model {model} is invalid")]
    CredentialInvalid { model: String },
    #[error(
        "Bad request for model {model}, the input may be too long for the context window of the model"
    )]
    RequestRejected { model: String },
    #[error("Prompt template could not be formatted: {0}")]
    TemplateFormat(String),
    #[error("{}", reserved_message(.variable, .template.as_deref()))]
    ReservedVariable {
        variable: String,
        template: Option<String>,
    },
    #[error("The output is not valid JSON for the expected shape: {reason}")]
    InvalidOutput { output: String, reason: String },
    #[error("LLM provider responded with status {status}: {message}")]
    ProviderStatus { status: u16, message: String },
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("LLM provider returned an unusable completion: {0}")]
    MalformedCompletion(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn reserved_message(variable: &str, template: Option<&str>) -> String {
    match template {
        Some(template) => format!("{template} is missing mandatory input variable: {variable}"),
        None => format!("Reserved chain value {variable} cannot be used as an input variable"),
    }
}

/// How a caller should surface an error across its own boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was wrong (unknown model, bad key, reserved names, bad chunking).
    InvalidInput,
    /// The request was well formed but the model could not produce a usable result.
    Unprocessable,
    /// A bug or an upstream failure unrelated to the request contents.
    Internal,
}

impl DistillError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DistillError::ModelUnavailable { .. }
            | DistillError::CredentialMissing { .. }
            | DistillError::CredentialInvalid { .. }
            | DistillError::ReservedVariable { .. }
            | DistillError::InvalidRequest(_) => ErrorClass::InvalidInput,
            DistillError::RequestRejected { .. } | DistillError::InvalidOutput { .. } => {
                ErrorClass::Unprocessable
            }
            DistillError::TemplateFormat(_)
            | DistillError::ProviderStatus { .. }
            | DistillError::LlmProvider(_)
            | DistillError::MalformedCompletion(_)
            | DistillError::Timeout(_)
            | DistillError::InvalidConfig(_)
            | DistillError::Serde(_) => ErrorClass::Internal,
        }
    }

    /// HTTP status reported by the provider, when the failure came from one.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            DistillError::ProviderStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn invalid_output(output: impl Into<String>, reason: impl Into<String>) -> Self {
        DistillError::InvalidOutput {
            output: output.into(),
            reason: reason.into(),
        }
    }
}
