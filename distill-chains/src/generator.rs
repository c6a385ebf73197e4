use std::collections::HashMap;
use std::sync::Arc;

use distill_core::{
    CallbackHandler, CallbackManager, DistillError, ErrorClass, ExecutionTrace, ModelRequest,
    ModelResolver, TraceRecorder, Value,
};
use distill_prompt::PromptTemplate;

use crate::{LlmChain, RefineChain};

#[derive(Clone, Debug)]
pub struct Generation {
    pub text: String,
    pub trace: Option<ExecutionTrace>,
}

#[derive(Clone, Debug)]
pub struct RefineGeneration {
    pub text: String,
    pub call_count: usize,
    pub trace: Option<ExecutionTrace>,
}

/// Resolves a model per request and runs a prompt, or a refine fold, against it.
#[derive(Clone, Debug)]
pub struct Generator<R> {
    resolver: R,
}

impl<R: ModelResolver> Generator<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub async fn generate(
        &self,
        model: &ModelRequest,
        prompt: &PromptTemplate,
        values: &HashMap<String, Value>,
        debug: bool,
    ) -> Result<Generation, DistillError> {
        if let Err(err) = prompt.validate(values) {
            tracing::error!(error = %err, "prompt template does not match input values");
            return Err(err);
        }
        let handle = self.resolver.resolve(model)?;

        let recorder = debug.then(|| Arc::new(TraceRecorder::new()));
        let callbacks = callbacks_for(recorder.as_ref());

        let text = LlmChain::new(handle, prompt.clone())
            .call(values, &callbacks, None)
            .await
            .map_err(|err| log_failure(&model.name, err))?;

        Ok(Generation {
            text,
            trace: finish_trace(recorder).await,
        })
    }

    /// Runs `initial` over the first chunk and `refine` over each later one.
    pub async fn generate_refine(
        &self,
        model: &ModelRequest,
        initial: &PromptTemplate,
        refine: &PromptTemplate,
        chunks: &[String],
        extra_values: &HashMap<String, Value>,
        debug: bool,
    ) -> Result<RefineGeneration, DistillError> {
        let handle = self.resolver.resolve(model)?;
        let chain = RefineChain::new(initial.clone(), refine.clone())?;

        let recorder = debug.then(|| Arc::new(TraceRecorder::new()));
        let callbacks = callbacks_for(recorder.as_ref());

        let output = chain
            .call(&handle, chunks, extra_values, &callbacks)
            .await
            .map_err(|err| log_failure(&model.name, err))?;

        Ok(RefineGeneration {
            text: output.text,
            call_count: output.call_count,
            trace: finish_trace(recorder).await,
        })
    }
}

fn callbacks_for(recorder: Option<&Arc<TraceRecorder>>) -> CallbackManager {
    let mut callbacks = CallbackManager::noop();
    if let Some(recorder) = recorder {
        let handler: Arc<dyn CallbackHandler> = recorder.clone();
        callbacks.add_handler(handler);
    }
    callbacks
}

async fn finish_trace(recorder: Option<Arc<TraceRecorder>>) -> Option<ExecutionTrace> {
    match recorder {
        Some(recorder) => Some(recorder.snapshot().await),
        None => None,
    }
}

fn log_failure(model: &str, err: DistillError) -> DistillError {
    match err.class() {
        ErrorClass::Internal => tracing::error!(model, error = %err, "generation failed"),
        _ => tracing::warn!(model, error = %err, "generation rejected"),
    }
    err
}
