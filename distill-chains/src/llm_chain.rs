use std::collections::HashMap;

use distill_core::{
    ensure_object, error_value, CallbackManager, DistillError, LlmInput, LlmRequest, LlmResult,
    ModelHandle, RunContext, RunType, Runnable, ToTraceInput, Value,
};
use distill_prompt::PromptTemplate;

pub const LLM_CHAIN_NAME: &str = "LLMChain";

/// Maps provider rejections that mean something to the caller onto typed errors.
///
/// A 401 is a bad key and a 400 is a payload the model refused, usually because
/// it does not fit the context window. Everything else passes through.
pub fn translate_provider_error(model: &str, error: DistillError) -> DistillError {
    match error.provider_status() {
        Some(401) => DistillError::CredentialInvalid {
            model: model.to_string(),
        },
        Some(400) => DistillError::RequestRejected {
            model: model.to_string(),
        },
        _ => error,
    }
}

/// One prompt rendered and sent to one model.
#[derive(Clone, Debug)]
pub struct LlmChain {
    handle: ModelHandle,
    prompt: PromptTemplate,
}

impl LlmChain {
    pub fn new(handle: ModelHandle, prompt: PromptTemplate) -> Self {
        Self { handle, prompt }
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Runs the chain as a child of `parent`, reporting a chain run and a model
    /// call run to `callbacks`.
    pub async fn call(
        &self,
        values: &HashMap<String, Value>,
        callbacks: &CallbackManager,
        parent: Option<&RunContext>,
    ) -> Result<String, DistillError> {
        let prompt = self.prompt.render(values)?;
        let model = self.handle.name();

        if callbacks.is_noop() {
            return self.send(prompt).await;
        }

        let chain_ctx = RunContext::child_of(parent, RunType::Chain, LLM_CHAIN_NAME);
        callbacks
            .on_start(&chain_ctx, &ensure_object(values.to_trace_input()))
            .await;

        let llm_ctx = chain_ctx.child(RunType::Llm, model);
        let input = LlmInput {
            model: model.to_string(),
            prompts: vec![prompt.clone()],
            temperature: None,
        };
        callbacks.on_llm_start(&llm_ctx, &input).await;

        let response = self
            .handle
            .llm()
            .invoke(LlmRequest::from_prompt(model, prompt))
            .await
            .map_err(|err| translate_provider_error(model, err));

        match response {
            Ok(response) => {
                let result = LlmResult {
                    model: model.to_string(),
                    generations: vec![response.content.clone()],
                    token_usage: response.usage,
                    finish_reason: response.finish_reason,
                };
                callbacks
                    .on_llm_end(&llm_ctx, &result, llm_ctx.elapsed_ms())
                    .await;
                let outputs = serde_json::json!({ "text": response.content });
                callbacks
                    .on_end(&chain_ctx, &outputs, chain_ctx.elapsed_ms())
                    .await;
                Ok(response.content)
            }
            Err(err) => {
                let error = error_value(&err);
                callbacks
                    .on_llm_error(&llm_ctx, &error, llm_ctx.elapsed_ms())
                    .await;
                callbacks
                    .on_error(&chain_ctx, &error, chain_ctx.elapsed_ms())
                    .await;
                Err(err)
            }
        }
    }

    async fn send(&self, prompt: String) -> Result<String, DistillError> {
        let model = self.handle.name();
        self.handle
            .llm()
            .invoke(LlmRequest::from_prompt(model, prompt))
            .await
            .map(|response| response.content)
            .map_err(|err| translate_provider_error(model, err))
    }
}

#[async_trait::async_trait]
impl Runnable<HashMap<String, Value>, String> for LlmChain {
    async fn invoke(&self, input: HashMap<String, Value>) -> Result<String, DistillError> {
        self.call(&input, &CallbackManager::noop(), None).await
    }
}
