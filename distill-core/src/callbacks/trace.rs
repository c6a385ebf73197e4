//! Per-invocation debug report assembled from lifecycle events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CallbackHandler, LlmInput, LlmResult, RunContext};
use crate::Value;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    pub chain_call_count: usize,
    pub model_call_count: usize,
    pub chains: Vec<ChainRecord>,
    pub calls: Vec<CallRecord>,
}

impl ExecutionTrace {
    /// True once every opened record has received its end or error.
    pub fn is_complete(&self) -> bool {
        self.chains.iter().all(ChainRecord::is_closed)
            && self.calls.iter().all(CallRecord::is_closed)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub chain_name: String,
    pub run_id: Uuid,
    pub parent_run_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub inputs: Value,
    pub outputs: Option<Value>,
    pub error: Option<Value>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl ChainRecord {
    pub fn is_closed(&self) -> bool {
        self.outputs.is_some() || self.error.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub model_name: String,
    pub run_id: Uuid,
    pub parent_run_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub prompts: Vec<String>,
    pub outputs: Option<LlmResult>,
    pub error: Option<Value>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl CallRecord {
    pub fn is_closed(&self) -> bool {
        self.outputs.is_some() || self.error.is_some()
    }
}

/// Records every chain run and model call of one invocation.
///
/// Owned by exactly one request. Terminal events for unknown or already closed
/// runs are logged and dropped instead of failing the request.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    trace: Mutex<ExecutionTrace>,
}

enum Terminal<'a> {
    Chain(Result<&'a Value, &'a Value>),
    Llm(Result<&'a LlmResult, &'a Value>),
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ExecutionTrace {
        self.trace.lock().await.clone()
    }

    pub fn into_trace(self) -> ExecutionTrace {
        self.trace.into_inner()
    }

    async fn close(&self, ctx: &RunContext, terminal: Terminal<'_>, duration_ms: u128) {
        let mut trace = self.trace.lock().await;
        let ended_at = Some(Utc::now());
        let duration_ms = Some(u64::try_from(duration_ms).unwrap_or(u64::MAX));

        match terminal {
            Terminal::Chain(result) => {
                let Some(record) = trace.chains.iter_mut().find(|r| r.run_id == ctx.run_id) else {
                    tracing::warn!(run_id = %ctx.run_id, "chain end for unknown run ignored");
                    return;
                };
                if record.is_closed() {
                    tracing::warn!(run_id = %ctx.run_id, "chain run already closed");
                    return;
                }
                match result {
                    Ok(outputs) => record.outputs = Some(outputs.clone()),
                    Err(error) => record.error = Some(error.clone()),
                }
                record.ended_at = ended_at;
                record.duration_ms = duration_ms;
            }
            Terminal::Llm(result) => {
                let Some(record) = trace.calls.iter_mut().find(|r| r.run_id == ctx.run_id) else {
                    tracing::warn!(run_id = %ctx.run_id, "model call end for unknown run ignored");
                    return;
                };
                if record.is_closed() {
                    tracing::warn!(run_id = %ctx.run_id, "model call already closed");
                    return;
                }
                match result {
                    Ok(outputs) => record.outputs = Some(outputs.clone()),
                    Err(error) => record.error = Some(error.clone()),
                }
                record.ended_at = ended_at;
                record.duration_ms = duration_ms;
            }
        }
    }
}

#[async_trait]
impl CallbackHandler for TraceRecorder {
    async fn on_start(&self, ctx: &RunContext, inputs: &Value) {
        let mut trace = self.trace.lock().await;
        trace.chain_call_count += 1;
        trace.chains.push(ChainRecord {
            chain_name: ctx.name.clone(),
            run_id: ctx.run_id,
            parent_run_id: ctx.parent_run_id,
            started_at: DateTime::<Utc>::from(ctx.start_time),
            inputs: inputs.clone(),
            outputs: None,
            error: None,
            ended_at: None,
            duration_ms: None,
        });
    }

    async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128) {
        self.close(ctx, Terminal::Chain(Ok(outputs)), duration_ms)
            .await;
    }

    async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        self.close(ctx, Terminal::Chain(Err(error)), duration_ms)
            .await;
    }

    async fn on_llm_start(&self, ctx: &RunContext, input: &LlmInput) {
        let mut trace = self.trace.lock().await;
        trace.model_call_count += 1;
        trace.calls.push(CallRecord {
            model_name: input.model.clone(),
            run_id: ctx.run_id,
            parent_run_id: ctx.parent_run_id,
            started_at: DateTime::<Utc>::from(ctx.start_time),
            prompts: input.prompts.clone(),
            outputs: None,
            error: None,
            ended_at: None,
            duration_ms: None,
        });
    }

    async fn on_llm_end(&self, ctx: &RunContext, result: &LlmResult, duration_ms: u128) {
        self.close(ctx, Terminal::Llm(Ok(result)), duration_ms).await;
    }

    async fn on_llm_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        self.close(ctx, Terminal::Llm(Err(error)), duration_ms).await;
    }
}
