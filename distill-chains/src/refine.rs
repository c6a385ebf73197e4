use std::collections::HashMap;

use distill_core::{
    ensure_object, error_value, CallbackManager, DistillError, ModelHandle, RunContext, RunType,
    ToTraceInput, Value,
};
use distill_prompt::PromptTemplate;

use crate::LlmChain;

pub const REFINE_CHAIN_NAME: &str = "RefineDocumentsChain";
/// Variable receiving the current chunk in both templates.
pub const CONTEXT_KEY: &str = "context";
/// Variable receiving the running answer in the refine template.
pub const EXISTING_ANSWER_KEY: &str = "existing_answer";

const RESERVED_KEYS: [&str; 2] = [CONTEXT_KEY, EXISTING_ANSWER_KEY];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefineOutput {
    pub text: String,
    pub call_count: usize,
}

/// Folds a pair of prompts over ordered chunks.
///
/// The first chunk goes through the initial prompt; every later chunk goes
/// through the refine prompt together with the answer so far. Steps run one
/// after the other and the first failure ends the run.
#[derive(Clone, Debug)]
pub struct RefineChain {
    initial: PromptTemplate,
    refine: PromptTemplate,
}

impl RefineChain {
    pub fn new(initial: PromptTemplate, refine: PromptTemplate) -> Result<Self, DistillError> {
        require_variable(&initial, "initialPromptTemplate", CONTEXT_KEY)?;
        require_variable(&refine, "refinePromptTemplate", CONTEXT_KEY)?;
        require_variable(&refine, "refinePromptTemplate", EXISTING_ANSWER_KEY)?;
        Ok(Self { initial, refine })
    }

    /// Rejects caller values that would clash with the chunk or running answer,
    /// and values that do not fit either template.
    pub fn check_values(&self, extra_values: &HashMap<String, Value>) -> Result<(), DistillError> {
        if let Some(reserved) = RESERVED_KEYS
            .iter()
            .find(|key| extra_values.contains_key(**key))
        {
            tracing::warn!(variable = *reserved, "reserved refine variable supplied by caller");
            return Err(DistillError::ReservedVariable {
                variable: (*reserved).to_string(),
                template: None,
            });
        }

        let mut values = extra_values.clone();
        values.insert(CONTEXT_KEY.to_string(), Value::String(String::new()));
        self.initial.validate(&values)?;
        values.insert(EXISTING_ANSWER_KEY.to_string(), Value::String(String::new()));
        self.refine.validate(&values)
    }

    pub async fn call(
        &self,
        handle: &ModelHandle,
        chunks: &[String],
        extra_values: &HashMap<String, Value>,
        callbacks: &CallbackManager,
    ) -> Result<RefineOutput, DistillError> {
        self.check_values(extra_values)?;

        let ctx = RunContext::root(RunType::Chain, REFINE_CHAIN_NAME);
        if !callbacks.is_noop() {
            let mut inputs = ensure_object(extra_values.to_trace_input());
            if let Value::Object(map) = &mut inputs {
                map.insert("input_documents".to_string(), Value::from(chunks.len()));
            }
            callbacks.on_start(&ctx, &inputs).await;
        }

        let initial = LlmChain::new(handle.clone(), self.initial.clone());
        let refine = LlmChain::new(handle.clone(), self.refine.clone());
        let mut answer = String::new();
        let mut call_count = 0;

        for (index, chunk) in chunks.iter().enumerate() {
            let mut values = extra_values.clone();
            values.insert(CONTEXT_KEY.to_string(), Value::String(chunk.clone()));
            let step = if index == 0 {
                &initial
            } else {
                values.insert(
                    EXISTING_ANSWER_KEY.to_string(),
                    Value::String(std::mem::take(&mut answer)),
                );
                &refine
            };

            call_count += 1;
            match step.call(&values, callbacks, Some(&ctx)).await {
                Ok(text) => answer = text,
                Err(err) => {
                    tracing::warn!(
                        model = %handle.name(),
                        step = index + 1,
                        chunks = chunks.len(),
                        error = %err,
                        "refine step failed"
                    );
                    if !callbacks.is_noop() {
                        callbacks
                            .on_error(&ctx, &error_value(&err), ctx.elapsed_ms())
                            .await;
                    }
                    return Err(err);
                }
            }
        }

        if !callbacks.is_noop() {
            let outputs = serde_json::json!({ "output_text": answer });
            callbacks.on_end(&ctx, &outputs, ctx.elapsed_ms()).await;
        }

        tracing::debug!(model = %handle.name(), chunks = chunks.len(), call_count, "refine finished");
        Ok(RefineOutput {
            text: answer,
            call_count,
        })
    }
}

fn require_variable(
    template: &PromptTemplate,
    template_name: &str,
    variable: &str,
) -> Result<(), DistillError> {
    if template.declares(variable) {
        Ok(())
    } else {
        Err(DistillError::ReservedVariable {
            variable: variable.to_string(),
            template: Some(template_name.to_string()),
        })
    }
}
