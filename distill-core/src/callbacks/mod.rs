use std::sync::Arc;
use std::time::{Instant, SystemTime};

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::Value;

mod llm;
mod trace;

pub use llm::{LlmInput, LlmResult, TokenUsage};
pub use trace::{CallRecord, ChainRecord, ExecutionTrace, TraceRecorder};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunType {
    Chain,
    Llm,
}

#[derive(Clone, Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub parent_run_id: Option<Uuid>,
    pub trace_id: Uuid,
    pub run_type: RunType,
    pub name: String,
    pub start_time: SystemTime,
    pub start_instant: Instant,
}

impl RunContext {
    pub fn root(run_type: RunType, name: impl Into<String>) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            parent_run_id: None,
            trace_id: run_id,
            run_type,
            name: name.into(),
            start_time: SystemTime::now(),
            start_instant: Instant::now(),
        }
    }

    pub fn child(&self, run_type: RunType, name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: Some(self.run_id),
            trace_id: self.trace_id,
            run_type,
            name: name.into(),
            start_time: SystemTime::now(),
            start_instant: Instant::now(),
        }
    }

    /// A child of `parent` when there is one, a fresh root otherwise.
    pub fn child_of(parent: Option<&RunContext>, run_type: RunType, name: impl Into<String>) -> Self {
        match parent {
            Some(parent) => parent.child(run_type, name),
            None => Self::root(run_type, name),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_instant.elapsed().as_millis()
    }
}

/// Observer of chain and model-call lifecycles.
///
/// `on_start`/`on_end`/`on_error` fire for chain runs, the `on_llm_*` family for
/// individual model calls. Every run is closed by exactly one end or error.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn on_start(&self, _ctx: &RunContext, _inputs: &Value) {}
    async fn on_end(&self, _ctx: &RunContext, _outputs: &Value, _duration_ms: u128) {}
    async fn on_error(&self, _ctx: &RunContext, _error: &Value, _duration_ms: u128) {}

    async fn on_llm_start(&self, _ctx: &RunContext, _input: &LlmInput) {}
    async fn on_llm_end(&self, _ctx: &RunContext, _result: &LlmResult, _duration_ms: u128) {}
    async fn on_llm_error(&self, _ctx: &RunContext, _error: &Value, _duration_ms: u128) {}
}

#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl CallbackManager {
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }

    pub fn noop() -> Self {
        Self { handlers: vec![] }
    }

    pub fn is_noop(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.handlers.push(handler);
    }

    pub async fn on_start(&self, ctx: &RunContext, inputs: &Value) {
        for handler in &self.handlers {
            handler.on_start(ctx, inputs).await;
        }
    }

    pub async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_end(ctx, outputs, duration_ms).await;
        }
    }

    pub async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_error(ctx, error, duration_ms).await;
        }
    }

    pub async fn on_llm_start(&self, ctx: &RunContext, input: &LlmInput) {
        for handler in &self.handlers {
            handler.on_llm_start(ctx, input).await;
        }
    }

    pub async fn on_llm_end(&self, ctx: &RunContext, result: &LlmResult, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_llm_end(ctx, result, duration_ms).await;
        }
    }

    pub async fn on_llm_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_llm_error(ctx, error, duration_ms).await;
        }
    }
}

pub trait ToTraceInput {
    fn to_trace_input(&self) -> Value;
}

impl<T> ToTraceInput for T
where
    T: Serialize,
{
    fn to_trace_input(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn ensure_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => Value::Object(serde_json::Map::from_iter([("value".to_string(), other)])),
    }
}

pub fn error_value(error: &impl std::fmt::Display) -> Value {
    Value::Object(serde_json::Map::from_iter([(
        "message".to_string(),
        Value::String(error.to_string()),
    )]))
}
