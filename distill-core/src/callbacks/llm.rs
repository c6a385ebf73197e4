//! Structured payloads for model-call lifecycle events.

/// Token consumption reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Model call parameters captured at start time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmInput {
    pub model: String,
    /// Rendered prompts (after template expansion), not the templates themselves
    pub prompts: Vec<String>,
    pub temperature: Option<f32>,
}

/// Model call results captured at end time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResult {
    pub model: String,
    pub generations: Vec<String>,
    pub token_usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}
