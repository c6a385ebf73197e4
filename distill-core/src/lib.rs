pub mod callbacks;
mod error;
mod llm;
mod model;
mod retry;
mod runnable;
mod value;

pub use callbacks::{
    ensure_object, error_value, CallRecord, CallbackHandler, CallbackManager,
    ChainRecord, ExecutionTrace, LlmInput, LlmResult, RunContext, RunType, ToTraceInput,
    TokenUsage, TraceRecorder,
};
pub use error::{DistillError, ErrorClass};
pub use llm::{Llm, LlmRequest, LlmResponse, Message, Role};
pub use model::{ModelHandle, ModelRequest, ModelResolver};
pub use retry::{is_retryable, Retrying};
pub use runnable::Runnable;
pub use value::Value;
